use super::BaseStore;
use crate::model::{
    FieldDescriptor, FieldOption, FieldType, PendingUpdate, Record, RecordPage, Selection,
    TableMeta, WriteValue,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

pub const DEFAULT_BASE_URL: &str = "https://open.feishu.cn";

/// Page size used when listing tables and fields
const LISTING_PAGE_SIZE: usize = 100;

/// Bitable base reached through the Lark / Feishu Open API
pub struct LarkBase {
    client: Client,
    base_url: String,
    app_token: String,
    tenant_token: String,
    default_table: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    tenant_access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct Paged<T> {
    #[serde(default)]
    items: Option<Vec<T>>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTable {
    table_id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiField {
    field_id: String,
    field_name: String,
    #[serde(rename = "type")]
    field_type: i64,
    #[serde(default)]
    property: Option<ApiFieldProperty>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiFieldProperty {
    #[serde(default)]
    options: Option<Vec<FieldOption>>,
}

#[derive(Debug, Deserialize)]
struct ApiRecord {
    record_id: String,
    #[serde(default)]
    fields: IndexMap<String, Value>,
}

fn field_type_from_code(code: i64) -> FieldType {
    match code {
        1 => FieldType::Text,
        3 => FieldType::SingleSelect,
        4 => FieldType::MultiSelect,
        _ => FieldType::Other,
    }
}

impl From<ApiField> for FieldDescriptor {
    fn from(field: ApiField) -> Self {
        FieldDescriptor {
            id: field.field_id,
            name: field.field_name,
            field_type: field_type_from_code(field.field_type),
            options: field
                .property
                .and_then(|p| p.options)
                .unwrap_or_default(),
        }
    }
}

/// Cell shape the Open API expects on write: multi-select cells take option names
fn write_value_to_api(value: &WriteValue) -> Value {
    match value {
        WriteValue::Text(text) => Value::String(text.clone()),
        WriteValue::Options(refs) => {
            Value::Array(refs.iter().map(|r| Value::String(r.text.clone())).collect())
        }
    }
}

impl LarkBase {
    /// Obtain a tenant access token and return a ready store
    pub async fn connect(
        base_url: String,
        app_token: String,
        app_id: String,
        app_secret: String,
        default_table: Option<String>,
    ) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        log::info!("🔧 Connecting to Lark base {app_token} at {base_url}");

        let client = Client::new();
        let response = client
            .post(format!("{base_url}/open-apis/auth/v3/tenant_access_token/internal"))
            .json(&json!({ "app_id": app_id, "app_secret": app_secret }))
            .send()
            .await
            .context("Failed to reach the Lark auth endpoint")?;
        let status = response.status();
        let token: TokenResponse = response
            .json()
            .await
            .with_context(|| format!("Unexpected auth response (HTTP {status})"))?;

        let tenant_token = match token.tenant_access_token {
            Some(t) if token.code == 0 => t,
            _ => {
                log::error!("❌ Lark authentication failed: code {} {}", token.code, token.msg);
                anyhow::bail!(
                    "Lark authentication failed (code {}): {}",
                    token.code,
                    token.msg
                );
            }
        };
        log::info!("✅ Lark authentication successful");

        Ok(Self {
            client,
            base_url,
            app_token,
            tenant_token,
            default_table,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/open-apis/bitable/v1/apps/{}{}",
            self.base_url, self.app_token, path
        )
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = request
            .bearer_auth(&self.tenant_token)
            .send()
            .await
            .with_context(|| format!("{what}: request failed"))?;
        let status = response.status();
        let body = response.text().await?;

        let parsed: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            log::error!("❌ {what}: unreadable response (HTTP {status}): {body}");
            anyhow::anyhow!("{what}: unreadable response (HTTP {status}): {e}")
        })?;

        if !status.is_success() || parsed.code != 0 {
            log::error!("❌ {what} failed: HTTP {status}, code {}, {}", parsed.code, parsed.msg);
            anyhow::bail!("{what} failed (HTTP {status}, code {}): {}", parsed.code, parsed.msg);
        }

        parsed
            .data
            .ok_or_else(|| anyhow::anyhow!("{what}: response carried no data"))
    }

    async fn list_all<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.url(path))
                .query(&[("page_size", LISTING_PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("page_token", token)]);
            }

            let page: Paged<T> = self.send(request, what).await?;
            items.extend(page.items.unwrap_or_default());
            if !page.has_more {
                break;
            }
            page_token = page.page_token;
        }

        Ok(items)
    }
}

#[async_trait]
impl BaseStore for LarkBase {
    fn describe(&self) -> String {
        format!("lark base {} ({})", self.app_token, self.base_url)
    }

    async fn list_tables(&self) -> Result<Vec<TableMeta>> {
        let tables: Vec<ApiTable> = self.list_all("/tables", "List tables").await?;
        Ok(tables
            .into_iter()
            .map(|t| TableMeta {
                id: t.table_id,
                name: t.name,
            })
            .collect())
    }

    async fn current_selection(&self) -> Result<Selection> {
        Ok(Selection {
            table_id: self.default_table.clone(),
        })
    }

    async fn field_descriptors(&self, table_id: &str) -> Result<Vec<FieldDescriptor>> {
        let fields: Vec<ApiField> = self
            .list_all(&format!("/tables/{table_id}/fields"), "List fields")
            .await?;
        Ok(fields.into_iter().map(FieldDescriptor::from).collect())
    }

    async fn records_page(
        &self,
        table_id: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<RecordPage> {
        let mut request = self
            .client
            .get(self.url(&format!("/tables/{table_id}/records")))
            .query(&[("page_size", page_size.to_string())]);
        if let Some(token) = page_token {
            request = request.query(&[("page_token", token)]);
        }

        let page: Paged<ApiRecord> = self.send(request, "List records").await?;
        Ok(RecordPage {
            records: page
                .items
                .unwrap_or_default()
                .into_iter()
                .map(|r| Record {
                    record_id: r.record_id,
                    fields: r.fields,
                })
                .collect(),
            has_more: page.has_more,
            page_token: page.page_token,
        })
    }

    async fn apply_record_updates(&self, table_id: &str, updates: &[PendingUpdate]) -> Result<()> {
        let records: Vec<Value> = updates
            .iter()
            .map(|update| {
                let fields: serde_json::Map<String, Value> = update
                    .fields
                    .iter()
                    .map(|(field_id, value)| (field_id.clone(), write_value_to_api(value)))
                    .collect();
                json!({ "record_id": update.record_id, "fields": fields })
            })
            .collect();

        let request = self
            .client
            .post(self.url(&format!("/tables/{table_id}/records/batch_update")))
            .json(&json!({ "records": records }));
        let _: Value = self.send(request, "Update records").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OptionRef;
    use mockito::Matcher;

    async fn connected(server: &mockito::ServerGuard) -> LarkBase {
        LarkBase::connect(
            server.url(),
            "app123".to_string(),
            "cli_id".to_string(),
            "secret".to_string(),
            Some("tbl1".to_string()),
        )
        .await
        .unwrap()
    }

    async fn mock_auth(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("POST", "/open-apis/auth/v3/tenant_access_token/internal")
            .match_body(Matcher::PartialJson(json!({"app_id": "cli_id", "app_secret": "secret"})))
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":0,"msg":"ok","tenant_access_token":"t-test","expire":7200}"#)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_auth_failure_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _auth = server
            .mock("POST", "/open-apis/auth/v3/tenant_access_token/internal")
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":10014,"msg":"app secret invalid"}"#)
            .create_async()
            .await;

        let result = LarkBase::connect(
            server.url(),
            "app123".to_string(),
            "cli_id".to_string(),
            "wrong".to_string(),
            None,
        )
        .await;
        let err = result.err().unwrap();
        assert!(err.to_string().contains("app secret invalid"));
    }

    #[tokio::test]
    async fn test_fields_map_type_codes_and_options() {
        let mut server = mockito::Server::new_async().await;
        let _auth = mock_auth(&mut server).await;
        let fields = server
            .mock("GET", "/open-apis/bitable/v1/apps/app123/tables/tbl1/fields")
            .match_query(Matcher::UrlEncoded("page_size".into(), "100".into()))
            .match_header("authorization", "Bearer t-test")
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "code": 0,
                    "msg": "success",
                    "data": {
                        "has_more": false,
                        "items": [
                            {"field_id": "fld1", "field_name": "Before", "type": 4,
                             "property": {"options": [{"id": "optA", "name": "A", "color": 0}]}},
                            {"field_id": "fld2", "field_name": "Notes", "type": 1,
                             "property": null},
                            {"field_id": "fld3", "field_name": "Due", "type": 5}
                        ]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = connected(&server).await;
        let descriptors = store.field_descriptors("tbl1").await.unwrap();
        fields.assert_async().await;

        assert_eq!(descriptors.len(), 3);
        assert_eq!(descriptors[0].field_type, FieldType::MultiSelect);
        assert_eq!(descriptors[0].option_by_id("optA").unwrap().name, "A");
        assert_eq!(descriptors[1].field_type, FieldType::Text);
        assert_eq!(descriptors[2].field_type, FieldType::Other);
        assert_eq!(
            store.current_selection().await.unwrap().table_id.as_deref(),
            Some("tbl1")
        );
    }

    #[tokio::test]
    async fn test_records_page_threads_token() {
        let mut server = mockito::Server::new_async().await;
        let _auth = mock_auth(&mut server).await;
        let page = server
            .mock("GET", "/open-apis/bitable/v1/apps/app123/tables/tbl1/records")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page_size".into(), "2".into()),
                Matcher::UrlEncoded("page_token".into(), "cursor-1".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "code": 0,
                    "msg": "success",
                    "data": {
                        "has_more": true,
                        "page_token": "cursor-2",
                        "total": 5,
                        "items": [
                            {"record_id": "rec1", "fields": {"fld1": ["A", "B"]}},
                            {"record_id": "rec2", "fields": {}}
                        ]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = connected(&server).await;
        let result = store.records_page("tbl1", 2, Some("cursor-1")).await.unwrap();
        page.assert_async().await;

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].cell("fld1"), &json!(["A", "B"]));
        assert!(result.has_more);
        assert_eq!(result.page_token.as_deref(), Some("cursor-2"));
    }

    #[tokio::test]
    async fn test_batch_update_sends_option_names() {
        let mut server = mockito::Server::new_async().await;
        let _auth = mock_auth(&mut server).await;
        let update = server
            .mock("POST", "/open-apis/bitable/v1/apps/app123/tables/tbl1/records/batch_update")
            .match_body(Matcher::Json(json!({
                "records": [
                    {"record_id": "rec1", "fields": {"fld_added": ["C"], "fld_deleted": "A"}}
                ]
            })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":0,"msg":"success","data":{"records":[]}}"#)
            .create_async()
            .await;

        let store = connected(&server).await;
        let pending = PendingUpdate {
            record_id: "rec1".to_string(),
            fields: IndexMap::from([
                (
                    "fld_added".to_string(),
                    WriteValue::Options(vec![OptionRef {
                        id: "optC".to_string(),
                        text: "C".to_string(),
                    }]),
                ),
                ("fld_deleted".to_string(), WriteValue::Text("A".to_string())),
            ]),
        };
        store.apply_record_updates("tbl1", &[pending]).await.unwrap();
        update.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_code_fails_the_call() {
        let mut server = mockito::Server::new_async().await;
        let _auth = mock_auth(&mut server).await;
        let _update = server
            .mock("POST", "/open-apis/bitable/v1/apps/app123/tables/tbl1/records/batch_update")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":1254001,"msg":"WrongRequestBody"}"#)
            .create_async()
            .await;

        let store = connected(&server).await;
        let err = store.apply_record_updates("tbl1", &[]).await.unwrap_err();
        assert!(err.to_string().contains("WrongRequestBody"));
        assert!(err.to_string().contains("1254001"));
    }
}
