//! OVHcloud REST API client

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use sha1::{Digest, Sha1};
use tokio::sync::OnceCell;

use crate::config::ProviderConfig;
use crate::inventory::{Availability, Cart, InventoryClient, Order};
use crate::io::{HttpClient, HttpResponse};
use crate::SniperError;

/// Availability values that mean "no stock"
const NO_STOCK: [&str; 2] = ["unavailable", "unknown"];

#[derive(Debug, Deserialize)]
struct PlanAvailability {
    fqn: String,
    #[serde(default)]
    datacenters: Vec<DatacenterAvailability>,
}

#[derive(Debug, Deserialize)]
struct DatacenterAvailability {
    datacenter: String,
    availability: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartResponse {
    cart_id: String,
}

#[derive(Debug, Deserialize)]
struct CartDetails {
    #[serde(default)]
    items: Vec<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutResponse {
    order_id: u64,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Map an endpoint alias to its API base URL
pub fn resolve_endpoint(endpoint: &str) -> String {
    match endpoint {
        "ovh-eu" => "https://eu.api.ovh.com/1.0".to_string(),
        "ovh-us" => "https://api.us.ovhcloud.com/1.0".to_string(),
        "ovh-ca" => "https://ca.api.ovh.com/1.0".to_string(),
        other => other.trim_end_matches('/').to_string(),
    }
}

/// Pick the first datacenter with stock, honouring a preferred datacenter
fn select_availability(plans: &[PlanAvailability], preferred: Option<&str>) -> Availability {
    let mut fqn = String::new();
    for plan in plans {
        fqn = plan.fqn.clone();
        let in_stock = plan.datacenters.iter().find(|dc| {
            preferred.is_none_or(|wanted| dc.datacenter == wanted)
                && !NO_STOCK.contains(&dc.availability.as_str())
        });
        if let Some(dc) = in_stock {
            return Availability {
                available: true,
                datacenter: dc.datacenter.clone(),
                fqn,
            };
        }
    }
    Availability::unavailable(fqn)
}

/// Client for the OVHcloud order and availability APIs
pub struct OvhClient {
    base_url: String,
    app_key: String,
    app_secret: String,
    consumer_key: String,
    time_delta: OnceCell<i64>,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for OvhClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OvhClient")
            .field("base_url", &self.base_url)
            .field("app_key", &self.app_key)
            .finish_non_exhaustive()
    }
}

impl OvhClient {
    pub fn new(config: &ProviderConfig, http: Arc<dyn HttpClient>) -> crate::Result<Self> {
        let ProviderConfig::Ovh {
            endpoint,
            app_key,
            app_secret,
            consumer_key,
        } = config
        else {
            return Err(SniperError::InvalidConfig(format!(
                "OvhClient cannot be built from a '{}' provider",
                config.type_name()
            )));
        };

        let base_url = resolve_endpoint(endpoint);
        tracing::debug!("Created OvhClient at {}", base_url);

        Ok(Self {
            base_url,
            app_key: app_key.clone(),
            app_secret: app_secret.clone(),
            consumer_key: consumer_key.clone(),
            time_delta: OnceCell::new(),
            http,
        })
    }

    /// Full request URL with percent-encoded query parameters
    fn url(&self, path: &str, query: &[(&str, &str)]) -> crate::Result<String> {
        let url = format!("{}{}", self.base_url, path);
        if query.is_empty() {
            return Ok(url);
        }
        reqwest::Url::parse_with_params(&url, query)
            .map(|url| url.to_string())
            .map_err(|e| SniperError::InvalidConfig(format!("Invalid OVH URL {}: {}", url, e)))
    }

    /// Server timestamp, using a clock offset fetched once from /auth/time
    async fn timestamp(&self) -> crate::Result<i64> {
        let delta = self
            .time_delta
            .get_or_try_init(|| async {
                let response = self.http.get(&self.url("/auth/time", &[])?, &[]).await?;
                let server: i64 = parse_response(response)?;
                let delta = server - local_epoch_seconds();
                tracing::debug!("OVH clock offset is {}s", delta);
                Ok::<i64, SniperError>(delta)
            })
            .await?;
        Ok(local_epoch_seconds() + delta)
    }

    fn signature(&self, method: &str, url: &str, body: &str, timestamp: i64) -> String {
        let payload = format!(
            "{}+{}+{}+{}+{}+{}",
            self.app_secret, self.consumer_key, method, url, body, timestamp
        );
        format!("$1${}", hex::encode(Sha1::digest(payload.as_bytes())))
    }

    async fn signed_headers(
        &self,
        method: &str,
        url: &str,
        body: &str,
    ) -> crate::Result<Vec<(String, String)>> {
        let timestamp = self.timestamp().await?;
        Ok(vec![
            ("X-Ovh-Application".to_string(), self.app_key.clone()),
            ("X-Ovh-Consumer".to_string(), self.consumer_key.clone()),
            ("X-Ovh-Timestamp".to_string(), timestamp.to_string()),
            (
                "X-Ovh-Signature".to_string(),
                self.signature(method, url, body, timestamp),
            ),
        ])
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> crate::Result<T> {
        let url = self.url(path, query)?;
        let headers = self.signed_headers("GET", &url, "").await?;
        let response = self.http.get(&url, &headers).await?;
        parse_response(response)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> crate::Result<T> {
        let url = self.url(path, &[])?;
        let body = body.to_string();
        let headers = self.signed_headers("POST", &url, &body).await?;
        let response = self.http.post_json(&url, &headers, &body).await?;
        parse_response(response)
    }
}

fn parse_response<T: DeserializeOwned>(response: HttpResponse) -> crate::Result<T> {
    if !response.is_success() {
        let message = serde_json::from_str::<ApiError>(&response.body)
            .map(|e| e.message)
            .unwrap_or(response.body);
        return Err(SniperError::Provider {
            status: response.status,
            message,
        });
    }
    Ok(serde_json::from_str(&response.body)?)
}

fn local_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[async_trait]
impl InventoryClient for OvhClient {
    fn name(&self) -> &str {
        "ovh"
    }

    async fn check_availability(
        &self,
        plan_code: &str,
        datacenter: Option<&str>,
    ) -> crate::Result<Availability> {
        let plans: Vec<PlanAvailability> = self
            .get(
                "/dedicated/server/datacenter/availabilities",
                &[("planCode", plan_code)],
            )
            .await?;
        tracing::debug!("{} availability entries for {}", plans.len(), plan_code);
        Ok(select_availability(&plans, datacenter))
    }

    async fn create_cart(&self, zone: &str) -> crate::Result<Cart> {
        let cart: CartResponse = self
            .post("/order/cart", &json!({ "ovhSubsidiary": zone }))
            .await?;
        let _: serde_json::Value = self
            .post(&format!("/order/cart/{}/assign", cart.cart_id), &json!({}))
            .await
            .or_else(|e| match e {
                // assign answers with an empty body
                SniperError::Json(_) => Ok(serde_json::Value::Null),
                other => Err(other),
            })?;
        Ok(Cart {
            cart_id: cart.cart_id,
        })
    }

    async fn add_item(&self, cart_id: &str, plan_code: &str, duration: &str) -> crate::Result<()> {
        let body = json!({
            "planCode": plan_code,
            "duration": duration,
            "pricingMode": "default",
            "quantity": 1,
        });
        let _: serde_json::Value = self
            .post(&format!("/order/cart/{}/baremetalServers", cart_id), &body)
            .await?;
        Ok(())
    }

    async fn configure(
        &self,
        cart_id: &str,
        os: &str,
        _duration: &str,
        datacenter: Option<&str>,
    ) -> crate::Result<()> {
        let details: CartDetails = self.get(&format!("/order/cart/{}", cart_id), &[]).await?;
        if details.items.is_empty() {
            return Err(SniperError::Provider {
                status: 404,
                message: format!("cart {} has no items to configure", cart_id),
            });
        }

        let mut options = vec![("dedicated_os", os)];
        if let Some(dc) = datacenter {
            options.push(("dedicated_datacenter", dc));
        }

        for item_id in details.items {
            for (label, value) in &options {
                let path = format!("/order/cart/{}/item/{}/configuration", cart_id, item_id);
                let _: serde_json::Value = self
                    .post(&path, &json!({ "label": label, "value": value }))
                    .await?;
                tracing::debug!("Configured item {} {}={}", item_id, label, value);
            }
        }
        Ok(())
    }

    async fn checkout(&self, cart_id: &str) -> crate::Result<Order> {
        let body = json!({
            "autoPayWithPreferredPaymentMethod": false,
            "waiveRetractationPeriod": false,
        });
        let checkout: CheckoutResponse = self
            .post(&format!("/order/cart/{}/checkout", cart_id), &body)
            .await?;
        Ok(Order {
            order_id: checkout.order_id.to_string(),
            url: checkout.url,
        })
    }
}
