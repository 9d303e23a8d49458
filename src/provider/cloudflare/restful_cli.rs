use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::record::{RecordDescriptor, RecordHandle};
use crate::wrapper::http::{Client, Header, HeaderKey, Response};
use crate::zone::{Auth, ZoneConfig};

use super::serializer::CfRecordBody;

pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

impl From<&Auth> for Vec<Header> {
    fn from(auth: &Auth) -> Self {
        match auth {
            Auth::ApiToken(api_token) => vec![Header::new(
                HeaderKey::Authorization,
                format!("Bearer {}", api_token),
            )],
            Auth::ApiKey { email, key } => vec![
                Header::new(HeaderKey::Custom("X-Auth-Email".to_string()), email.clone()),
                Header::new(HeaderKey::Custom("X-Auth-Key".to_string()), key.clone()),
            ],
        }
    }
}

pub struct CfClient {
    base_url: String,
    cli: Client,
}

impl CfClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut cli = Client::with_timeout(timeout)?;
        cli.set_default_headers(vec![
            Header::new(HeaderKey::ContentType, "application/json".to_string()),
            Header::new(HeaderKey::Accept, "application/json".to_string()),
        ]);

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            cli,
        })
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, zone_id)
    }
}

#[derive(Debug, Deserialize)]
struct CfResponse<T> {
    success: bool,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct CfRecordId {
    id: String,
}

/// Provider id of the created record, or the raw body on refusal.
fn parse_create_response(resp: Response) -> Result<String> {
    if !resp.is_success() {
        return Err(Error::CreateFailed(format!(
            "status {}: {}",
            resp.status, resp.body
        )));
    }

    let parsed: CfResponse<CfRecordId> = serde_json::from_str(&resp.body)
        .map_err(|e| Error::CreateFailed(format!("{}: {}", e, resp.body)))?;

    match parsed {
        CfResponse {
            success: true,
            result: Some(CfRecordId { id }),
        } => Ok(id),
        _ => Err(Error::CreateFailed(resp.body)),
    }
}

fn parse_delete_response(resp: Response) -> Result<()> {
    if resp.status == 404 {
        debug!("record already absent: {}", resp.body);
        return Ok(());
    }

    if !resp.is_success() {
        return Err(Error::DeleteFailed(format!(
            "status {}: {}",
            resp.status, resp.body
        )));
    }

    let parsed: CfResponse<serde_json::Value> = serde_json::from_str(&resp.body)
        .map_err(|e| Error::DeleteFailed(format!("{}: {}", e, resp.body)))?;

    if parsed.success {
        Ok(())
    } else {
        Err(Error::DeleteFailed(resp.body))
    }
}

#[async_trait]
impl Provider for CfClient {
    async fn create(
        &self,
        zone: &Arc<ZoneConfig>,
        record: &RecordDescriptor,
    ) -> Result<RecordHandle> {
        let url = self.records_url(&zone.zone_id);
        let body = serde_json::to_string(&CfRecordBody::new(record, zone.ttl))?;
        let headers: Vec<Header> = (&zone.authentication).into();

        let resp = self
            .cli
            .post(&url, Some(headers), body)
            .await
            .map_err(|e| Error::CreateFailed(e.to_string()))?;
        let id = parse_create_response(resp)?;

        info!("DNS record [{}] was created with id {}", record, id);
        Ok(RecordHandle::new(zone.clone(), record.clone(), id))
    }

    async fn delete(&self, handle: &RecordHandle) -> Result<()> {
        let url = format!("{}/{}", self.records_url(&handle.zone.zone_id), handle.id);
        let headers: Vec<Header> = (&handle.zone.authentication).into();

        let resp = self
            .cli
            .delete(&url, Some(headers))
            .await
            .map_err(|e| Error::DeleteFailed(e.to_string()))?;
        parse_delete_response(resp)?;

        info!("DNS record [{}] ({}) was removed", handle.descriptor, handle.id);
        Ok(())
    }
}
