use axum::extract::State;
use axum::Json;

use crate::api::types::{ApiContext, SchemaEntry, SchemaListResponse};

/// `GET /schemas`: every section schema as JSON Schema, in registry order.
pub async fn list(State(ctx): State<ApiContext>) -> Json<SchemaListResponse> {
    let schemas = ctx
        .schemas
        .iter()
        .map(|(id, schema)| SchemaEntry {
            name: id.as_str(),
            schema: schema.to_json_schema(),
        })
        .collect();
    Json(SchemaListResponse { schemas })
}
