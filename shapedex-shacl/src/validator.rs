//! Client for the remote SHACL validator service.
//!
//! The validator takes the shapes graph, the shape IRI to check against,
//! the data graph (with linked resources already folded in), and the root
//! subject IRI. It answers with a JSON object mapping each subject IRI to
//! the shape IRI it conforms to; an empty object means nothing conforms.

use crate::error::{Result, ShaclError};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Subject IRI -> conforming shape IRI.
pub type Conformance = BTreeMap<String, String>;

/// Remote SHACL validation.
#[async_trait]
pub trait ShaclValidator: Send + Sync {
    async fn validate(
        &self,
        shapes_graph: &str,
        shape_id: &str,
        data_graph: &str,
        data_id: &str,
    ) -> Result<Conformance>;
}

/// HTTP form-POST validator client.
pub struct HttpValidator {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpValidator {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ShaclValidator for HttpValidator {
    async fn validate(
        &self,
        shapes_graph: &str,
        shape_id: &str,
        data_graph: &str,
        data_id: &str,
    ) -> Result<Conformance> {
        let resp = self
            .http
            .post(&self.endpoint)
            .form(&[
                ("shapesGraph", shapes_graph),
                ("shapeID", shape_id),
                ("dataGraph", data_graph),
                ("dataID", data_id),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ShaclError::Validator {
                data_id: data_id.to_string(),
                url: self.endpoint.clone(),
                status,
                body: body.trim().to_string(),
            });
        }

        let raw: BTreeMap<String, String> = resp.json().await?;
        // subject keys may arrive N-Triples-bracketed; normalize to bare IRIs
        Ok(raw
            .into_iter()
            .map(|(subject, shape)| (unbracket(&subject).to_string(), shape))
            .collect())
    }
}

fn unbracket(iri: &str) -> &str {
    iri.strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(iri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_form_fields_and_decodes_map() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("shapesGraph"))
            .and(body_string_contains("shapeID"))
            .and(body_string_contains("dataGraph"))
            .and(body_string_contains("dataID"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "<http://ex/b1>": "http://ex/Book",
                "http://ex/b1/chapter": "urn:chapter-shape"
            })))
            .mount(&server)
            .await;

        let conformance = HttpValidator::new(server.uri())
            .validate("shapes ttl", "http://ex/Book", "data ttl", "http://ex/b1")
            .await
            .unwrap();

        assert_eq!(
            conformance.get("http://ex/b1").map(String::as_str),
            Some("http://ex/Book")
        );
        assert_eq!(
            conformance.get("http://ex/b1/chapter").map(String::as_str),
            Some("urn:chapter-shape")
        );
    }

    #[tokio::test]
    async fn empty_object_means_nothing_conforms() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let conformance = HttpValidator::new(server.uri())
            .validate("s", "http://ex/Book", "d", "http://ex/b1")
            .await
            .unwrap();
        assert!(conformance.is_empty());
    }

    #[tokio::test]
    async fn non_2xx_is_surfaced_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("engine exploded"))
            .mount(&server)
            .await;

        let err = HttpValidator::new(server.uri())
            .validate("s", "http://ex/Book", "d", "http://ex/b1")
            .await
            .unwrap_err();
        match err {
            ShaclError::Validator { status, body, data_id, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "engine exploded");
                assert_eq!(data_id, "http://ex/b1");
            }
            other => panic!("expected Validator error, got {other:?}"),
        }
    }
}
