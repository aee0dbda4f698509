//! HTTP transport for the coordinator contract
//!
//! Each call is a `POST {server}/rpc/<CallName>` with a JSON body. The reply
//! is a JSON envelope `{"result": ..., "error": ...}`.

use crate::item::{CrawledPackage, CrawledPerson, PushOutcome};
use crate::rpc::wire::{
    calls, CountRequest, PackageRecord, PathRequest, PathsRequest, PersonRecord,
    PushPersonReply, Reply,
};
use crate::rpc::{Coordinator, RpcError, RpcResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Coordinator client speaking JSON over HTTP
#[derive(Debug, Clone)]
pub struct HttpCoordinator {
    client: Client,
    base: String,
}

impl HttpCoordinator {
    /// Creates a client for the coordinator at `server_addr`
    ///
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client (user agent, proxy and timeouts preset)
    /// * `server_addr` - Base URL, e.g. `http://localhost:8080`
    pub fn new(client: Client, server_addr: &str) -> Self {
        Self {
            client,
            base: server_addr.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, call: &str) -> String {
        format!("{}/rpc/{}", self.base, call)
    }

    /// Performs one call and unwraps the reply envelope
    async fn call<Req, T>(&self, call: &'static str, request: &Req) -> RpcResult<Option<T>>
    where
        Req: Serialize + ?Sized + Sync,
        T: DeserializeOwned + Send,
    {
        let response = self
            .client
            .post(self.endpoint(call))
            .json(request)
            .send()
            .await
            .map_err(|source| RpcError::Transport { call, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Status {
                call,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| RpcError::Transport { call, source })?;

        let reply: Reply<T> = serde_json::from_slice(&body).map_err(|e| RpcError::Decode {
            call,
            message: e.to_string(),
        })?;

        match reply.error {
            Some(message) if !message.is_empty() => Err(RpcError::Remote { call, message }),
            _ => Ok(reply.result),
        }
    }

    async fn call_for<Req, T>(&self, call: &'static str, request: &Req) -> RpcResult<T>
    where
        Req: Serialize + ?Sized + Sync,
        T: DeserializeOwned + Send,
    {
        self.call(call, request)
            .await?
            .ok_or(RpcError::MissingResult { call })
    }
}

#[async_trait]
impl Coordinator for HttpCoordinator {
    async fn fetch_package_list(&self, count: usize) -> RpcResult<Vec<String>> {
        self.call_for(calls::FETCH_PACKAGE_LIST, &CountRequest { count })
            .await
    }

    async fn fetch_person_list(&self, count: usize) -> RpcResult<Vec<String>> {
        self.call_for(calls::FETCH_PERSON_LIST, &CountRequest { count })
            .await
    }

    async fn append_packages(&self, paths: &[String]) -> RpcResult<usize> {
        self.call_for(calls::APPEND_PACKAGES, &PathsRequest { paths })
            .await
    }

    async fn push_package(&self, package: &CrawledPackage) -> RpcResult<()> {
        self.call::<_, serde_json::Value>(calls::PUSH_PACKAGE, &PackageRecord::from(package))
            .await
            .map(|_| ())
    }

    async fn push_person(&self, person: &CrawledPerson) -> RpcResult<PushOutcome> {
        let reply: PushPersonReply = self
            .call_for(calls::PUSH_PERSON, &PersonRecord::from(person))
            .await?;
        Ok(PushOutcome {
            new_package: reply.new_package,
        })
    }

    async fn report_bad_package(&self, path: &str) -> RpcResult<()> {
        self.call::<_, serde_json::Value>(calls::REPORT_BAD_PACKAGE, &PathRequest { path })
            .await
            .map(|_| ())
    }

    async fn touch_package(&self, path: &str) -> RpcResult<bool> {
        self.call_for(calls::TOUCH_PACKAGE, &PathRequest { path })
            .await
    }
}
