//! Blog models shared by the unit tests.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::model::ApiModel;
use crate::transform::{DateTransform, IdTransform, ModelTransform, StringTransform, WireMapping};
use crate::types::ApiRoutes;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Author {
    pub id: String,
    pub name: String,
}

impl ApiModel for Author {
    fn api_namespace() -> &'static str {
        "author"
    }

    fn routes() -> ApiRoutes {
        ApiRoutes::new().index("/authors.json").show("/authors/:id:.json")
    }

    fn wire_mapping() -> WireMapping<Self> {
        WireMapping::new()
            .field("id", IdTransform, |a: &mut Self, v| a.id = v)
            .field("name", StringTransform, |a: &mut Self, v| a.name = v)
    }

    fn to_wire(&self) -> Map<String, Value> {
        let mut wire = Map::new();
        wire.insert("id".to_string(), json!(self.id));
        wire.insert("name".to_string(), json!(self.name));
        wire
    }

    fn has_persisted_identity(&self) -> bool {
        !self.id.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub contents: String,
    pub created_at: Option<DateTime<Utc>>,
    pub author: Option<Author>,
}

impl ApiModel for Post {
    fn api_namespace() -> &'static str {
        "post"
    }

    fn routes() -> ApiRoutes {
        ApiRoutes::new()
            .index("/posts.json")
            .show("/posts/:id:.json")
            .create("/posts.json")
            .update("/posts/:id:.json")
            .destroy("/posts/:id:.json")
    }

    fn wire_mapping() -> WireMapping<Self> {
        WireMapping::new()
            .field("id", IdTransform, |p: &mut Self, v| p.id = v)
            .field("title", StringTransform, |p: &mut Self, v| p.title = v)
            .field("contents", StringTransform, |p: &mut Self, v| p.contents = v)
            .field("created_at", DateTransform, |p: &mut Self, v| p.created_at = v)
            .field("author", ModelTransform::<Author>::new(), |p: &mut Self, v| p.author = Some(v))
    }

    fn to_wire(&self) -> Map<String, Value> {
        let mut wire = Map::new();
        wire.insert("id".to_string(), json!(self.id));
        wire.insert("title".to_string(), json!(self.title));
        wire.insert("contents".to_string(), json!(self.contents));
        if let Some(created_at) = self.created_at {
            wire.insert("created_at".to_string(), json!(created_at.to_rfc3339()));
        }
        if let Some(author) = &self.author {
            wire.insert("author".to_string(), Value::Object(author.to_wire()));
        }
        wire
    }

    fn has_persisted_identity(&self) -> bool {
        !self.id.is_empty()
    }
}
