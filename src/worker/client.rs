//! Coordinator Client
//!
//! Outbound HTTP calls from a worker to the coordinator. Every call is
//! bounded by the configured connect and request timeouts; a timeout is
//! reported as a transport failure, same as a refused connection.

use axum::body::Bytes;
use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::coordinator::protocol::{
    ENDPOINT_CHUNK, ENDPOINT_MEMBERS, ENDPOINT_REGISTER, ENDPOINT_SET_TOTAL, RegisterRequest,
    RegisterResponse,
};
use crate::error::{FleetError, Result};
use crate::membership::types::{InstanceId, InstanceRecord};
use crate::workload::types::WorkloadSpec;

#[derive(Debug, Clone)]
pub struct CoordinatorClient {
    http_client: reqwest::Client,
}

impl CoordinatorClient {
    pub fn new(request_timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            // Fresh connection per call: a dead coordinator must show up as a
            // failed connect, not hide behind a pooled socket.
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|source| FleetError::Transport {
                url: "<client builder>".to_string(),
                source,
            })?;

        Ok(Self { http_client })
    }

    pub async fn register(&self, target: &str, address: Option<String>) -> Result<RegisterResponse> {
        let url = format!("http://{}{}", target, ENDPOINT_REGISTER);
        let response = self
            .http_client
            .post(&url)
            .json(&RegisterRequest { address })
            .send()
            .await
            .map_err(|source| transport(&url, source))?;

        decode(url, response).await
    }

    /// Heartbeat and assignment in one round trip.
    pub async fn get_chunk(&self, coordinator: &str, id: &InstanceId) -> Result<WorkloadSpec> {
        let url = format!("http://{}{}", coordinator, ENDPOINT_CHUNK);
        let response = self
            .http_client
            .get(&url)
            .query(&[("id", id.0.as_str())])
            .send()
            .await
            .map_err(|source| transport(&url, source))?;

        decode(url, response).await
    }

    pub async fn get_membership(&self, coordinator: &str) -> Result<Vec<InstanceRecord>> {
        let url = format!("http://{}{}", coordinator, ENDPOINT_MEMBERS);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|source| transport(&url, source))?;

        decode(url, response).await
    }

    pub async fn set_total(&self, coordinator: &str, mem: &str) -> Result<WorkloadSpec> {
        let (status, body) = self.forward_set_total(coordinator, mem).await?;
        let url = format!("http://{}{}", coordinator, ENDPOINT_SET_TOTAL);
        if !status.is_success() {
            return Err(FleetError::CoordinatorStatus {
                url,
                status: status.as_u16(),
            });
        }
        Ok(serde_json::from_slice(&body)?)
    }

    /// Relays a registration and hands back the coordinator's answer verbatim.
    pub async fn forward_register(
        &self,
        coordinator: &str,
        request: &RegisterRequest,
    ) -> Result<(StatusCode, Bytes)> {
        let url = format!("http://{}{}", coordinator, ENDPOINT_REGISTER);
        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|source| transport(&url, source))?;

        raw(url, response).await
    }

    /// Relays a set-total request and hands back the coordinator's answer
    /// verbatim, including validation errors.
    pub async fn forward_set_total(&self, coordinator: &str, mem: &str) -> Result<(StatusCode, Bytes)> {
        let url = format!("http://{}{}", coordinator, ENDPOINT_SET_TOTAL);
        let response = self
            .http_client
            .post(&url)
            .query(&[("mem", mem)])
            .send()
            .await
            .map_err(|source| transport(&url, source))?;

        raw(url, response).await
    }
}

fn transport(url: &str, source: reqwest::Error) -> FleetError {
    FleetError::Transport {
        url: url.to_string(),
        source,
    }
}

async fn decode<T: DeserializeOwned>(url: String, response: reqwest::Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(FleetError::CoordinatorStatus {
            url,
            status: response.status().as_u16(),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|source| transport(&url, source))
}

async fn raw(url: String, response: reqwest::Response) -> Result<(StatusCode, Bytes)> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|source| transport(&url, source))?;
    Ok((status, body))
}
