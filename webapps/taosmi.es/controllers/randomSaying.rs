use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use runrs::{Controller, Error, Invocation, QueryOptions, Repository, Result, SqlRepository};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Saying {
    pub quote: String,
    pub author: String,
}

/// `GET /randomSaying`: one saying picked at random, as JSON.
pub struct RandomSaying;

impl RandomSaying {
    async fn find_random(repo: SqlRepository) -> Result<Option<Saying>> {
        let mut sayings = repo.to::<Saying>();
        sayings.from("sayings").select("quote,author");
        let options = QueryOptions::new()
            .order_by(sayings.dialect().random_function())
            .limit(1);
        Ok(sayings.find(&options).await?.into_iter().next())
    }
}

#[async_trait::async_trait]
impl Controller for RandomSaying {
    async fn main(&self, call: Invocation) -> Result<Response> {
        let repo = call.repository().await?;
        let saying = Self::find_random(repo)
            .await?
            .ok_or_else(|| Error::handler(StatusCode::NOT_FOUND, "No sayings stored"))?;
        Ok(Json(saying).into_response())
    }
}
