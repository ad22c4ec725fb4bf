//! Resource client and bound-instance form.
//!
//! # Design
//! `Api<M>` is the generic operation set for one model type: raw verbs
//! (`get`, `post`, `put`, `delete`) and the Rails-style helpers built on
//! them (`find`, `find_array`, `create`, `update`). Each operation builds a
//! fresh `ApiCall`, dispatches it through the `ApiManager` and classifies the
//! envelope with the type's namespace.
//!
//! `Form<M, P>` binds one instance held behind a `Persistence` capability.
//! `save` and `destroy` write any extracted object back into that instance
//! in a single mutation and return the full classified response, so callers
//! can branch on the error accessors even when the call failed.
//!
//! The only `Err` these methods return is a construction-time contract
//! violation (missing route, empty path, unencodable parameters).

use std::marker::PhantomData;

use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use crate::config::ApiConfig;
use crate::error::Result;
use crate::http::HttpMethod;
use crate::manager::ApiManager;
use crate::model::ApiModel;
use crate::response::{error_messages, ClassifiedResponse, Outcome, ValidationError};
use crate::store::{Persistence, Record};
use crate::types::{ApiCall, Parameters, RouteKind};

/// Generic operations for the model type `M`.
pub struct Api<M> {
    manager: ApiManager,
    config: Option<ApiConfig>,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for Api<M> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            config: self.config.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: ApiModel> Api<M> {
    pub fn new(manager: &ApiManager) -> Self {
        Self {
            manager: manager.clone(),
            config: None,
            _model: PhantomData,
        }
    }

    /// Use `config` instead of the type's derived configuration.
    pub fn with_config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Configuration calls are dispatched with.
    pub fn config(&self) -> ApiConfig {
        self.config
            .clone()
            .unwrap_or_else(|| M::api_config(self.manager.config()))
    }

    pub async fn perform(&self, call: &ApiCall) -> Result<ClassifiedResponse<M>> {
        let config = self.config();
        let raw = self.manager.request(call, &config).await?;
        Ok(ClassifiedResponse::classify(raw, call.namespace()))
    }

    /// Run `call` on the tokio runtime and hand the outcome to `callback`
    /// exactly once.
    pub fn perform_detached<F>(&self, call: ApiCall, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<ClassifiedResponse<M>>) + Send + 'static,
    {
        let api = self.clone();
        tokio::spawn(async move {
            let result = api.perform(&call).await;
            callback(result);
        })
    }

    async fn call(&self, method: HttpMethod, path: &str, parameters: Parameters) -> Result<ClassifiedResponse<M>> {
        let call = ApiCall::build(method, path, parameters, M::namespace())?;
        self.perform(&call).await
    }

    pub async fn get(&self, path: &str, parameters: Parameters) -> Result<ClassifiedResponse<M>> {
        self.call(HttpMethod::Get, path, parameters).await
    }

    pub async fn post(&self, path: &str, parameters: Parameters) -> Result<ClassifiedResponse<M>> {
        self.call(HttpMethod::Post, path, parameters).await
    }

    pub async fn put(&self, path: &str, parameters: Parameters) -> Result<ClassifiedResponse<M>> {
        self.call(HttpMethod::Put, path, parameters).await
    }

    pub async fn delete(&self, path: &str, parameters: Parameters) -> Result<ClassifiedResponse<M>> {
        self.call(HttpMethod::Delete, path, parameters).await
    }

    /// GET the index route and return the single extracted object.
    pub async fn find(&self) -> Result<(Option<M>, ClassifiedResponse<M>)> {
        let response = self.get(M::routes().get(RouteKind::Index)?, Parameters::new()).await?;
        Ok((response.object().cloned(), response))
    }

    /// GET the index route and return the extracted array, empty when
    /// nothing could be extracted.
    pub async fn find_array(&self) -> Result<(Vec<M>, ClassifiedResponse<M>)> {
        self.find_array_at(M::routes().get(RouteKind::Index)?).await
    }

    pub async fn find_array_at(&self, path: &str) -> Result<(Vec<M>, ClassifiedResponse<M>)> {
        let response = self.get(path, Parameters::new()).await?;
        let items = response.array().map(<[M]>::to_vec).unwrap_or_default();
        Ok((items, response))
    }

    /// POST to the create route.
    pub async fn create(&self, parameters: Parameters) -> Result<(Option<M>, ClassifiedResponse<M>)> {
        let response = self.post(M::routes().get(RouteKind::Create)?, parameters).await?;
        Ok((response.object().cloned(), response))
    }

    /// PUT to the update route.
    pub async fn update(&self, parameters: Parameters) -> Result<(Option<M>, ClassifiedResponse<M>)> {
        let response = self.put(M::routes().get(RouteKind::Update)?, parameters).await?;
        Ok((response.object().cloned(), response))
    }
}

/// A model instance bound to the remote resource it mirrors.
pub struct Form<M, P = Record<M>> {
    api: Api<M>,
    record: P,
    status: Option<Outcome>,
    validation_errors: Vec<ValidationError>,
    server_errors: Option<Value>,
}

impl<M: ApiModel> Form<M> {
    /// Bind a fresh in-memory record holding `model`.
    pub fn from_model(api: Api<M>, model: M) -> Self {
        Self::new(api, Record::new(model))
    }
}

impl<M: ApiModel, P: Persistence<M>> Form<M, P> {
    pub fn new(api: Api<M>, record: P) -> Self {
        Self {
            api,
            record,
            status: None,
            validation_errors: Vec::new(),
            server_errors: None,
        }
    }

    /// Snapshot of the bound instance.
    pub fn model(&self) -> M {
        self.record.read()
    }

    pub fn record(&self) -> &P {
        &self.record
    }

    /// Verdict of the last call, if any.
    pub fn status(&self) -> Option<Outcome> {
        self.status
    }

    pub fn validation_errors(&self) -> &[ValidationError] {
        &self.validation_errors
    }

    pub fn server_errors(&self) -> Option<&Value> {
        self.server_errors.as_ref()
    }

    pub fn has_errors(&self) -> bool {
        !self.validation_errors.is_empty() || self.server_errors.is_some()
    }

    /// Messages in the legacy form format: `base` messages verbatim, the
    /// rest as `"Title can't be blank"`.
    pub fn error_messages(&self) -> Vec<String> {
        let mut messages: Vec<String> = self
            .validation_errors
            .iter()
            .map(|error| {
                if error.is_base() {
                    error.message.clone()
                } else {
                    format!("{} {}", crate::response::humanize(&error.field), error.message)
                }
            })
            .collect();
        if let Some(server_errors) = &self.server_errors {
            messages.extend(error_messages(server_errors));
        }
        messages
    }

    /// Apply user-supplied wire values to the bound instance.
    pub fn update_from_form(&self, form: &Map<String, Value>) {
        self.record.mutate(&mut |model: &mut M| model.apply_wire_update(form));
    }

    /// Record the verdict of `response` and merge any extracted object into
    /// the bound instance.
    pub fn update_from_response(&mut self, response: &ClassifiedResponse<M>) {
        self.status = Some(response.outcome());
        if let Some(object) = response.response_object() {
            self.record.mutate(&mut |model: &mut M| model.apply_wire_update(object));
        }
        self.validation_errors = response.validation_errors().map(<[_]>::to_vec).unwrap_or_default();
        self.server_errors = response.server_errors().cloned();
    }

    /// PUT to the update route when the instance already exists remotely,
    /// otherwise POST to the create route.
    pub async fn save(&mut self) -> Result<ClassifiedResponse<M>> {
        let model = self.record.read();
        let namespace = M::namespace();
        let parameters = namespace.wrap(model.to_wire());

        let call = if model.has_persisted_identity() {
            ApiCall::put(&model.route(RouteKind::Update)?, parameters, namespace)?
        } else {
            ApiCall::post(&model.route(RouteKind::Create)?, parameters, namespace)?
        };

        let response = self.api.perform(&call).await?;
        self.update_from_response(&response);
        Ok(response)
    }

    pub async fn destroy(&mut self) -> Result<ClassifiedResponse<M>> {
        self.destroy_with(Parameters::new()).await
    }

    pub async fn destroy_with(&mut self, parameters: Parameters) -> Result<ClassifiedResponse<M>> {
        let model = self.record.read();
        let call = ApiCall::delete(&model.route(RouteKind::Destroy)?, parameters, M::namespace())?;
        let response = self.api.perform(&call).await?;
        self.update_from_response(&response);
        Ok(response)
    }
}

impl<M: ApiModel, P: Persistence<M> + 'static> Form<M, P> {
    /// Save on the tokio runtime and hand the form back with the outcome.
    pub fn save_detached<F>(mut self, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Self, Result<ClassifiedResponse<M>>) + Send + 'static,
    {
        tokio::spawn(async move {
            let result = self.save().await;
            callback(self, result);
        })
    }
}
