//! Zoho Inventory (v1) client.
//!
//! Every entity operation is first turned into a [`RequestPlan`] by
//! [`InventoryEndpoints`] and then sent by the shared [`ApiClient`]. Write
//! payloads travel as the `JSONString` query parameter, as the API expects.

use crate::adapters::http::{ApiClient, ApiResponse, FilePart, RequestPlan};
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const PER_PAGE: u32 = 200;

/// Collections that can be listed page by page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InventoryResource {
    CompositeItems,
    CreditNotes,
    Contacts,
    InventoryAdjustments,
    ItemDetails,
    Invoices,
    Items,
    PurchaseOrders,
    SalesOrders,
    PriceBooks,
}

impl InventoryResource {
    pub const ALL: [InventoryResource; 10] = [
        InventoryResource::CompositeItems,
        InventoryResource::CreditNotes,
        InventoryResource::Contacts,
        InventoryResource::InventoryAdjustments,
        InventoryResource::ItemDetails,
        InventoryResource::Invoices,
        InventoryResource::Items,
        InventoryResource::PurchaseOrders,
        InventoryResource::SalesOrders,
        InventoryResource::PriceBooks,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            InventoryResource::CompositeItems => "compositeitems",
            InventoryResource::CreditNotes => "creditnotes",
            InventoryResource::Contacts => "contacts",
            InventoryResource::InventoryAdjustments => "inventoryadjustments",
            InventoryResource::ItemDetails => "itemdetails",
            InventoryResource::Invoices => "invoices",
            InventoryResource::Items => "items",
            InventoryResource::PurchaseOrders => "purchaseorders",
            InventoryResource::SalesOrders => "salesorders",
            InventoryResource::PriceBooks => "pricebooks",
        }
    }

    /// Key of the record array in a list response.
    pub fn response_key(&self) -> &'static str {
        match self {
            InventoryResource::CompositeItems => "composite_items",
            InventoryResource::InventoryAdjustments => "inventory_adjustments",
            InventoryResource::ItemDetails => "items",
            other => other.path(),
        }
    }
}

impl fmt::Display for InventoryResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for InventoryResource {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        InventoryResource::ALL
            .into_iter()
            .find(|r| r.path() == s)
            .ok_or_else(|| EtlError::invalid_operation("inventory", s, "not a valid Zoho Inventory API method"))
    }
}

impl TryFrom<String> for InventoryResource {
    type Error = EtlError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<InventoryResource> for String {
    fn from(value: InventoryResource) -> Self {
        value.path().to_string()
    }
}

/// Single-record lookups addressed by a record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailKind {
    SalesOrderLineItems,
    InvoiceLineItems,
    CreditNoteLineItems,
    ContactLineItems,
    ContactPersons,
    InventoryAdjustmentLineItems,
    Bundles,
}

impl DetailKind {
    fn path(&self, id: &str) -> String {
        match self {
            DetailKind::SalesOrderLineItems => format!("salesorders/{}", id),
            DetailKind::InvoiceLineItems => format!("invoices/{}", id),
            DetailKind::CreditNoteLineItems => format!("creditnotes/{}", id),
            DetailKind::ContactLineItems => format!("contacts/{}", id),
            DetailKind::ContactPersons => format!("contacts/{}/contact_persons", id),
            DetailKind::InventoryAdjustmentLineItems => format!("inventoryadjustments/{}", id),
            DetailKind::Bundles => format!("compositeitems/{}", id),
        }
    }
}

impl FromStr for DetailKind {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "salesorder_lineitems" => Ok(DetailKind::SalesOrderLineItems),
            "invoice_lineitems" => Ok(DetailKind::InvoiceLineItems),
            "creditnote_lineitems" => Ok(DetailKind::CreditNoteLineItems),
            "contact_lineitems" => Ok(DetailKind::ContactLineItems),
            "contact_persons" => Ok(DetailKind::ContactPersons),
            "inventory_adjustments_lineitems" => Ok(DetailKind::InventoryAdjustmentLineItems),
            "bundles" => Ok(DetailKind::Bundles),
            other => Err(EtlError::invalid_operation("detail", other, "url for method is not defined")),
        }
    }
}

/// Parses the lowercase mode names used by schedulers and the CLI.
macro_rules! mode_enum {
    ($name:ident, $entity:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = EtlError;

            fn from_str(s: &str) -> Result<Self> {
                match s.to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(EtlError::invalid_operation($entity, s, "mode not defined")),
                }
            }
        }
    };
}

mode_enum!(InvoiceMode, "invoice", {
    Update => "update",
    Get => "get",
    Create => "create",
    Draft => "draft",
    Submit => "submit",
    Approve => "approve",
    Void => "void",
    Sent => "sent",
    Delete => "delete",
});

mode_enum!(ItemMode, "item", {
    Create => "create",
    Get => "get",
    Delete => "delete",
    Update => "update",
});

mode_enum!(ItemStatus, "item status", {
    Active => "active",
    Inactive => "inactive",
});

mode_enum!(ContactMode, "contact", {
    Get => "get",
    Put => "put",
    Post => "post",
    Delete => "delete",
    Inactive => "inactive",
});

mode_enum!(ContactPersonMode, "contact person", {
    Get => "get",
    GetList => "get_list",
    Put => "put",
    Post => "post",
    SetPrimary => "set_primary",
});

mode_enum!(PdfKind, "pdf", {
    Invoice => "invoice",
    CreditNote => "creditnote",
});

impl InvoiceMode {
    pub fn requires_id(&self) -> bool {
        !matches!(self, InvoiceMode::Create)
    }
}

impl ItemMode {
    pub fn requires_id(&self) -> bool {
        !matches!(self, ItemMode::Create)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageAction {
    Get,
    Post { file_name: String, bytes: Vec<u8> },
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryEndpoints {
    pub api_endpoint: String,
    pub organization_id: String,
}

impl Default for InventoryEndpoints {
    fn default() -> Self {
        Self {
            api_endpoint: "https://inventory.zoho.eu/api/v1/".to_string(),
            organization_id: String::new(),
        }
    }
}

fn require_id<'a>(entity: &str, mode: &str, id: Option<&'a str>) -> Result<&'a str> {
    match id {
        Some(id) if !id.trim().is_empty() => Ok(id),
        _ => Err(EtlError::invalid_operation(
            entity,
            mode,
            format!("{} id not provided for mode {} when required", entity, mode),
        )),
    }
}

fn json_string(payload: &Value) -> Result<String> {
    Ok(serde_json::to_string(payload)?)
}

impl InventoryEndpoints {
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_endpoint.trim_end_matches('/'), path)
    }

    fn with_org(&self, plan: RequestPlan) -> RequestPlan {
        plan.param("organization_id", &self.organization_id)
    }

    pub fn list_plan(&self, resource: InventoryResource, page: u32) -> RequestPlan {
        self.with_org(RequestPlan::get(self.url(resource.path())))
            .param("page", page)
            .param("per_page", PER_PAGE)
            .param("sort_column", "last_modified_time")
            .param("sort_order", "D")
    }

    pub fn detail_plan(&self, kind: DetailKind, id: &str) -> RequestPlan {
        self.with_org(RequestPlan::get(self.url(&kind.path(id))))
    }

    pub fn invoice_plan(
        &self,
        mode: InvoiceMode,
        invoice_id: Option<&str>,
        updates: Option<&Value>,
    ) -> Result<RequestPlan> {
        let id = if mode.requires_id() {
            Some(require_id("invoice", mode.as_str(), invoice_id)?)
        } else {
            None
        };
        let id = id.unwrap_or_default();

        let plan = match mode {
            InvoiceMode::Update => RequestPlan::put(self.url(&format!("invoices/{}", id)))
                .param("oauthscope", "ZohoInventory.invoices.UPDATE"),
            InvoiceMode::Get => RequestPlan::get(self.url(&format!("invoices/{}", id)))
                .param("oauthscope", "ZohoInventory.invoices.READ"),
            InvoiceMode::Create => RequestPlan::post(self.url("invoices"))
                .param("oauthscope", "ZohoInventory.invoices.CREATE")
                .param("send", false)
                .param("ignore_auto_number_generation", true),
            InvoiceMode::Draft => RequestPlan::post(self.url(&format!("invoices/{}/status/draft", id)))
                .param("oauthscope", "ZohoInventory.invoices.CREATE"),
            InvoiceMode::Submit => RequestPlan::post(self.url(&format!("invoices/{}/submit", id))),
            InvoiceMode::Approve => RequestPlan::post(self.url(&format!("invoices/{}/approve", id))),
            InvoiceMode::Void => RequestPlan::post(self.url(&format!("invoices/{}/status/void", id)))
                .param("oauthscope", "ZohoInventory.invoices.CREATE"),
            InvoiceMode::Sent => RequestPlan::post(self.url(&format!("invoices/{}/status/sent", id)))
                .param("oauthscope", "ZohoInventory.invoices.CREATE"),
            InvoiceMode::Delete => RequestPlan::delete(self.url(&format!("invoices/{}", id)))
                .param("oauthscope", "ZohoInventory.invoices.DELETE"),
        };

        let plan = match (mode, updates) {
            (InvoiceMode::Update | InvoiceMode::Create, Some(updates)) => {
                plan.param("JSONString", json_string(updates)?)
            }
            (InvoiceMode::Update | InvoiceMode::Create, None) => {
                return Err(EtlError::invalid_operation(
                    "invoice",
                    mode.as_str(),
                    "invoice payload not provided",
                ))
            }
            _ => plan,
        };

        Ok(self.with_org(plan))
    }

    pub fn item_plan(&self, mode: ItemMode, item_id: Option<&str>, updates: Option<&Value>) -> Result<RequestPlan> {
        let plan = match mode {
            ItemMode::Create => RequestPlan::post(self.url("items"))
                .param("oauthscope", "ZohoInventory.items.CREATE"),
            ItemMode::Get | ItemMode::Delete | ItemMode::Update => {
                let id = require_id("item", mode.as_str(), item_id)?;
                let url = self.url(&format!("items/{}", id));
                match mode {
                    ItemMode::Get => RequestPlan::get(url).param("oauthscope", "ZohoInventory.items.READ"),
                    ItemMode::Delete => {
                        RequestPlan::delete(url).param("oauthscope", "ZohoInventory.items.DELETE")
                    }
                    _ => RequestPlan::put(url).param("oauthscope", "ZohoInventory.items.UPDATE"),
                }
            }
        };

        let plan = match updates {
            Some(updates) if matches!(mode, ItemMode::Create | ItemMode::Update) => {
                plan.param("JSONString", json_string(updates)?)
            }
            _ => plan,
        };

        Ok(self.with_org(plan))
    }

    pub fn item_status_plan(&self, item_id: &str, status: ItemStatus) -> RequestPlan {
        self.with_org(RequestPlan::post(
            self.url(&format!("items/{}/{}", item_id, status.as_str())),
        ))
        .param("oauthscope", "ZohoInventory.items.UPDATE")
    }

    pub fn get_item_plan(&self, item_id: &str) -> RequestPlan {
        self.with_org(RequestPlan::get(self.url(&format!("items/{}", item_id))))
    }

    pub fn item_details_plan(&self, item_ids: &[&str]) -> RequestPlan {
        self.with_org(RequestPlan::get(self.url(InventoryResource::ItemDetails.path())))
            .param("item_ids", item_ids.join(","))
    }

    pub fn inventory_adjustment_plan(&self, data: &Value, adjustment_id: Option<&str>) -> Result<RequestPlan> {
        let plan = match adjustment_id {
            Some(id) => RequestPlan::put(self.url(&format!("inventoryadjustments/{}", id)))
                .param("oauthscope", "ZohoInventory.inventoryadjustments.UPDATE"),
            None => RequestPlan::post(self.url("inventoryadjustments"))
                .param("oauthscope", "ZohoInventory.inventoryadjustments.CREATE"),
        };
        Ok(self.with_org(plan).param("JSONString", json_string(data)?))
    }

    pub fn image_plan(&self, item_id: &str, action: &ImageAction) -> RequestPlan {
        let url = self.url(&format!("items/{}/image", item_id));
        let plan = match action {
            ImageAction::Get => RequestPlan::get(url).raw(),
            ImageAction::Post { file_name, bytes } => RequestPlan::post(url).file(FilePart {
                field: "image".to_string(),
                file_name: file_name.clone(),
                mime: "image/jpeg".to_string(),
                bytes: bytes.clone(),
            }),
            ImageAction::Delete => RequestPlan::delete(url),
        };
        self.with_org(plan)
    }

    pub fn pdf_plan(&self, kind: PdfKind, record_id: &str) -> RequestPlan {
        let path = match kind {
            PdfKind::Invoice => format!("invoices/{}", record_id),
            PdfKind::CreditNote => format!("creditnotes/{}", record_id),
        };
        self.with_org(RequestPlan::get(self.url(&path)))
            .param("oauthscope", "ZohoInventory.invoices.READ")
            .param("accept", "pdf")
            .raw()
    }

    pub fn cancel_purchase_order_plan(&self, purchase_order_id: &str) -> Result<RequestPlan> {
        let id = require_id("purchase order", "cancel", Some(purchase_order_id))?;
        Ok(self.with_org(RequestPlan::post(
            self.url(&format!("purchaseorders/{}/status/cancelled", id)),
        )))
    }

    pub fn contact_plan(
        &self,
        mode: ContactMode,
        contact: Option<&Value>,
        contact_id: Option<&str>,
    ) -> Result<RequestPlan> {
        let entity = "contact";
        let plan = match mode {
            ContactMode::Get => {
                let url = match contact_id {
                    Some(id) => self.url(&format!("contacts/{}", id)),
                    None => self.url("contacts"),
                };
                RequestPlan::get(url).param("oauthscope", "ZohoInventory.contacts.READ")
            }
            ContactMode::Put => {
                let id = require_id(entity, mode.as_str(), contact_id)?;
                RequestPlan::put(self.url(&format!("contacts/{}", id)))
                    .param("oauthscope", "ZohoInventory.contacts.UPDATE")
            }
            ContactMode::Post => RequestPlan::post(self.url("contacts"))
                .param("oauthscope", "ZohoInventory.contacts.CREATE"),
            ContactMode::Delete => {
                let id = require_id(entity, mode.as_str(), contact_id)?;
                RequestPlan::delete(self.url(&format!("contacts/{}", id)))
                    .param("oauthscope", "ZohoInventory.contacts.DELETE")
            }
            ContactMode::Inactive => {
                let id = require_id(entity, mode.as_str(), contact_id)?;
                RequestPlan::post(self.url(&format!("contacts/{}/inactive", id)))
                    .param("oauthscope", "ZohoInventory.contacts.CREATE")
            }
        };

        let plan = match (mode, contact) {
            (ContactMode::Put | ContactMode::Post, Some(contact)) => {
                plan.param("JSONString", json_string(contact)?)
            }
            (ContactMode::Put | ContactMode::Post, None) => {
                return Err(EtlError::invalid_operation(entity, mode.as_str(), "contact payload not provided"))
            }
            _ => plan,
        };

        Ok(self.with_org(plan))
    }

    pub fn contact_person_plan(
        &self,
        mode: ContactPersonMode,
        contact_person: Option<&Value>,
        contact_person_id: Option<&str>,
        contact_id: Option<&str>,
    ) -> Result<RequestPlan> {
        let entity = "contact person";
        let plan = match mode {
            ContactPersonMode::Get => {
                let contact = require_id("contact", mode.as_str(), contact_id)?;
                let person = require_id(entity, mode.as_str(), contact_person_id)?;
                RequestPlan::get(self.url(&format!("contacts/{}/contactpersons/{}", contact, person)))
                    .param("oauthscope", "ZohoInventory.contacts.READ")
            }
            ContactPersonMode::GetList => {
                let contact = require_id("contact", mode.as_str(), contact_id)?;
                RequestPlan::get(self.url(&format!("contacts/{}/contactpersons", contact)))
                    .param("oauthscope", "ZohoInventory.contacts.READ")
            }
            ContactPersonMode::Put => {
                let person = require_id(entity, mode.as_str(), contact_person_id)?;
                RequestPlan::put(self.url(&format!("contacts/contactpersons/{}", person)))
                    .param("oauthscope", "ZohoInventory.contacts.UPDATE")
            }
            ContactPersonMode::Post => RequestPlan::post(self.url("contacts/contactpersons"))
                .param("oauthscope", "ZohoInventory.contacts.CREATE"),
            ContactPersonMode::SetPrimary => {
                let person = require_id(entity, mode.as_str(), contact_person_id)?;
                RequestPlan::post(self.url(&format!("contacts/contactpersons/{}/primary", person)))
                    .param("oauthscope", "ZohoInventory.contacts.CREATE")
            }
        };

        let plan = match (mode, contact_person) {
            (ContactPersonMode::Put | ContactPersonMode::Post, Some(person)) => {
                plan.param("JSONString", json_string(person)?)
            }
            (ContactPersonMode::Put | ContactPersonMode::Post, None) => {
                return Err(EtlError::invalid_operation(
                    entity,
                    mode.as_str(),
                    "contact person payload not provided",
                ))
            }
            _ => plan,
        };

        Ok(self.with_org(plan))
    }

    pub fn price_list_plan(&self) -> RequestPlan {
        self.with_org(RequestPlan::get(self.url(InventoryResource::PriceBooks.path())))
            .param("oauthscope", "ZohoInventory.settings.READ")
    }
}

fn response_message(response: &Value) -> &str {
    response
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("no message")
}

pub struct InventoryClient {
    api: ApiClient,
    endpoints: InventoryEndpoints,
}

impl InventoryClient {
    pub fn new(api: ApiClient, endpoints: InventoryEndpoints) -> Self {
        Self { api, endpoints }
    }

    pub fn endpoints(&self) -> &InventoryEndpoints {
        &self.endpoints
    }

    async fn send_logged(&self, label: &str, plan: RequestPlan) -> Result<Value> {
        let response = self.api.send_json(&plan).await?;
        tracing::info!("📨 {} url: {} message: {}", label, plan.url, response_message(&response));
        Ok(response)
    }

    pub async fn list(&self, resource: InventoryResource, page: u32) -> Result<Value> {
        let plan = self.endpoints.list_plan(resource, page);
        self.api.send_json(&plan).await
    }

    /// Fetch every page of `resource`, following `page_context.has_more_page`.
    pub async fn list_all(&self, resource: InventoryResource) -> Result<Vec<Value>> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let response = self.list(resource, page).await?;
            let batch = response
                .get(resource.response_key())
                .and_then(Value::as_array)
                .ok_or_else(|| EtlError::ProcessingError {
                    message: format!("{} page {} has no '{}' array", resource, page, resource.response_key()),
                })?;
            records.extend(batch.iter().cloned());
            tracing::debug!("📄 {} page {}: {} records", resource, page, batch.len());

            let has_more = response
                .pointer("/page_context/has_more_page")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !has_more || batch.is_empty() {
                break;
            }
            page += 1;
        }

        tracing::info!("✅ Listed {} {} across {} page(s)", records.len(), resource, page);
        Ok(records)
    }

    pub async fn detail(&self, kind: DetailKind, id: &str) -> Result<Value> {
        self.api.send_json(&self.endpoints.detail_plan(kind, id)).await
    }

    pub async fn invoice(
        &self,
        mode: InvoiceMode,
        invoice_id: Option<&str>,
        updates: Option<&Value>,
    ) -> Result<Value> {
        let plan = self.endpoints.invoice_plan(mode, invoice_id, updates)?;
        self.send_logged(&format!("Invoice Mode: {}", mode), plan).await
    }

    pub async fn item(&self, mode: ItemMode, item_id: Option<&str>, updates: Option<&Value>) -> Result<Value> {
        let plan = self.endpoints.item_plan(mode, item_id, updates)?;
        self.send_logged(&format!("Item Mode: {}", mode), plan).await
    }

    pub async fn item_status(&self, item_id: &str, status: ItemStatus) -> Result<Value> {
        self.send_logged("Item status", self.endpoints.item_status_plan(item_id, status))
            .await
    }

    pub async fn get_item(&self, item_id: &str) -> Result<Value> {
        let plan = self.endpoints.get_item_plan(item_id);
        self.send_logged("Get item", plan).await
    }

    pub async fn get_item_details(&self, item_ids: &[&str]) -> Result<Value> {
        self.send_logged("Item details", self.endpoints.item_details_plan(item_ids))
            .await
    }

    pub async fn inventory_adjustment(&self, data: &Value, adjustment_id: Option<&str>) -> Result<Value> {
        let plan = self.endpoints.inventory_adjustment_plan(data, adjustment_id)?;
        self.send_logged("Inventory adjustment", plan).await
    }

    pub async fn image(&self, item_id: &str, action: ImageAction) -> Result<ApiResponse> {
        let plan = self.endpoints.image_plan(item_id, &action);
        let response = self.api.send(&plan).await?;
        tracing::info!("🖼️ Image {} for item {}", plan.method, item_id);
        Ok(response)
    }

    /// Upload a JPEG from disk as the item image.
    pub async fn upload_image(&self, item_id: &str, path: &Path) -> Result<ApiResponse> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image.jpg")
            .to_string();
        self.image(item_id, ImageAction::Post { file_name, bytes }).await
    }

    pub async fn pdf(&self, kind: PdfKind, record_id: &str) -> Result<Vec<u8>> {
        let response = self.api.send(&self.endpoints.pdf_plan(kind, record_id)).await?;
        tracing::info!("📄 Downloaded {} pdf {}", kind, record_id);
        response.into_bytes()
    }

    pub async fn cancel_purchase_order(&self, purchase_order_id: &str) -> Result<Value> {
        let plan = self.endpoints.cancel_purchase_order_plan(purchase_order_id)?;
        self.send_logged("Cancel purchase order", plan).await
    }

    pub async fn contacts(
        &self,
        mode: ContactMode,
        contact: Option<&Value>,
        contact_id: Option<&str>,
    ) -> Result<Value> {
        let plan = self.endpoints.contact_plan(mode, contact, contact_id)?;
        let response = self.api.send_json(&plan).await?;

        let id = contact_id
            .map(str::to_string)
            .or_else(|| {
                response
                    .pointer("/contact/contact_id")
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            })
            .unwrap_or_else(|| "-".to_string());
        tracing::info!("📨 Response Code for zoho id: {}: {}", id, response_message(&response));
        Ok(response)
    }

    pub async fn contact_persons(
        &self,
        mode: ContactPersonMode,
        contact_person: Option<&Value>,
        contact_person_id: Option<&str>,
        contact_id: Option<&str>,
    ) -> Result<Value> {
        let plan = self
            .endpoints
            .contact_person_plan(mode, contact_person, contact_person_id, contact_id)?;
        self.send_logged(&format!("Contact person mode: {}", mode), plan).await
    }

    pub async fn price_list(&self) -> Result<Vec<Value>> {
        let response = self
            .send_logged("Price list", self.endpoints.price_list_plan())
            .await?;
        match response.get("pricebooks") {
            Some(Value::Array(books)) => Ok(books.clone()),
            _ => Err(EtlError::ProcessingError {
                message: "price list response has no 'pricebooks' array".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use serde_json::json;

    fn endpoints() -> InventoryEndpoints {
        InventoryEndpoints {
            api_endpoint: "https://inventory.zoho.eu/api/v1/".to_string(),
            organization_id: "20071234".to_string(),
        }
    }

    #[test]
    fn test_resource_parsing() {
        assert_eq!("salesorders".parse::<InventoryResource>().unwrap(), InventoryResource::SalesOrders);
        assert_eq!(InventoryResource::CompositeItems.response_key(), "composite_items");
        assert!("bananas".parse::<InventoryResource>().is_err());
    }

    #[test]
    fn test_list_plan_uses_standard_pagination() {
        let plan = endpoints().list_plan(InventoryResource::Invoices, 3);

        assert_eq!(plan.method, Method::GET);
        assert_eq!(plan.url, "https://inventory.zoho.eu/api/v1/invoices");
        assert_eq!(plan.param_value("organization_id"), Some("20071234"));
        assert_eq!(plan.param_value("page"), Some("3"));
        assert_eq!(plan.param_value("per_page"), Some("200"));
        assert_eq!(plan.param_value("sort_column"), Some("last_modified_time"));
        assert_eq!(plan.param_value("sort_order"), Some("D"));
    }

    #[test]
    fn test_detail_paths() {
        let e = endpoints();
        let kind: DetailKind = "contact_persons".parse().unwrap();
        assert_eq!(
            e.detail_plan(kind, "460000000026049").url,
            "https://inventory.zoho.eu/api/v1/contacts/460000000026049/contact_persons"
        );
        assert_eq!(
            e.detail_plan(DetailKind::Bundles, "9").url,
            "https://inventory.zoho.eu/api/v1/compositeitems/9"
        );
        assert!("unknown_lineitems".parse::<DetailKind>().is_err());
    }

    #[test]
    fn test_invoice_modes_map_to_verbs_and_urls() {
        let e = endpoints();
        let cases = [
            (InvoiceMode::Get, Method::GET, "invoices/7", Some("ZohoInventory.invoices.READ")),
            (InvoiceMode::Draft, Method::POST, "invoices/7/status/draft", Some("ZohoInventory.invoices.CREATE")),
            (InvoiceMode::Submit, Method::POST, "invoices/7/submit", None),
            (InvoiceMode::Approve, Method::POST, "invoices/7/approve", None),
            (InvoiceMode::Void, Method::POST, "invoices/7/status/void", Some("ZohoInventory.invoices.CREATE")),
            (InvoiceMode::Sent, Method::POST, "invoices/7/status/sent", Some("ZohoInventory.invoices.CREATE")),
            (InvoiceMode::Delete, Method::DELETE, "invoices/7", Some("ZohoInventory.invoices.DELETE")),
        ];

        for (mode, method, path, scope) in cases {
            let plan = e.invoice_plan(mode, Some("7"), None).unwrap();
            assert_eq!(plan.method, method, "mode {}", mode);
            assert_eq!(plan.url, e.url(path), "mode {}", mode);
            assert_eq!(plan.param_value("oauthscope"), scope, "mode {}", mode);
            assert_eq!(plan.param_value("organization_id"), Some("20071234"));
        }
    }

    #[test]
    fn test_invoice_create_carries_payload() {
        let payload = json!({"customer_id": "42", "line_items": [{"item_id": "1", "quantity": 2}]});
        let plan = endpoints()
            .invoice_plan(InvoiceMode::Create, None, Some(&payload))
            .unwrap();

        assert_eq!(plan.method, Method::POST);
        assert_eq!(plan.param_value("send"), Some("false"));
        assert_eq!(plan.param_value("ignore_auto_number_generation"), Some("true"));
        let sent: Value = serde_json::from_str(plan.param_value("JSONString").unwrap()).unwrap();
        assert_eq!(sent, payload);
    }

    #[test]
    fn test_invoice_mode_without_id_is_rejected() {
        let err = endpoints()
            .invoice_plan(InvoiceMode::Approve, None, None)
            .unwrap_err();
        assert!(matches!(err, EtlError::InvalidOperation { .. }));
        assert!(err.to_string().contains("invoice id not provided for mode approve"));
    }

    #[test]
    fn test_unknown_modes_are_rejected() {
        assert!("archive".parse::<InvoiceMode>().is_err());
        assert!("patch".parse::<ItemMode>().is_err());
        assert!("dormant".parse::<ItemStatus>().is_err());
        assert_eq!("SET_PRIMARY".parse::<ContactPersonMode>().unwrap(), ContactPersonMode::SetPrimary);
    }

    #[test]
    fn test_item_plans() {
        let e = endpoints();
        let update = json!({"rate": 12.5});

        let create = e.item_plan(ItemMode::Create, None, Some(&update)).unwrap();
        assert_eq!(create.url, e.url("items"));
        assert!(create.param_value("JSONString").is_some());

        let get = e.item_plan(ItemMode::Get, Some("55"), None).unwrap();
        assert_eq!(get.method, Method::GET);
        assert_eq!(get.param_value("JSONString"), None);

        let put = e.item_plan(ItemMode::Update, Some("55"), Some(&update)).unwrap();
        assert_eq!(put.method, Method::PUT);
        assert_eq!(put.param_value("oauthscope"), Some("ZohoInventory.items.UPDATE"));

        assert!(e.item_plan(ItemMode::Delete, None, None).is_err());

        let inactive = e.item_status_plan("55", ItemStatus::Inactive);
        assert_eq!(inactive.url, e.url("items/55/inactive"));
    }

    #[test]
    fn test_item_details_joins_ids() {
        let plan = endpoints().item_details_plan(&["1", "2", "3"]);
        assert_eq!(plan.param_value("item_ids"), Some("1,2,3"));
    }

    #[test]
    fn test_inventory_adjustment_create_vs_update() {
        let e = endpoints();
        let data = json!({"reason": "Stocktake"});
        let create = e.inventory_adjustment_plan(&data, None).unwrap();
        assert_eq!(create.method, Method::POST);
        let update = e.inventory_adjustment_plan(&data, Some("88")).unwrap();
        assert_eq!(update.method, Method::PUT);
        assert_eq!(update.url, e.url("inventoryadjustments/88"));
    }

    #[test]
    fn test_pdf_and_image_plans_are_raw() {
        let e = endpoints();
        let pdf = e.pdf_plan(PdfKind::CreditNote, "31");
        assert!(pdf.raw);
        assert_eq!(pdf.url, e.url("creditnotes/31"));
        assert_eq!(pdf.param_value("accept"), Some("pdf"));

        assert!(e.image_plan("9", &ImageAction::Get).raw);
        let upload = e.image_plan(
            "9",
            &ImageAction::Post {
                file_name: "widget.jpg".to_string(),
                bytes: vec![0xFF, 0xD8],
            },
        );
        assert_eq!(upload.method, Method::POST);
        assert_eq!(upload.file.as_ref().map(|f| f.field.as_str()), Some("image"));
        assert!(!upload.raw);
    }

    #[test]
    fn test_contact_plans() {
        let e = endpoints();
        let contact = json!({"contact_name": "Acme"});

        assert_eq!(e.contact_plan(ContactMode::Get, None, None).unwrap().url, e.url("contacts"));
        let inactive = e.contact_plan(ContactMode::Inactive, None, Some("12")).unwrap();
        assert_eq!(inactive.method, Method::POST);
        assert_eq!(inactive.url, e.url("contacts/12/inactive"));
        assert!(e.contact_plan(ContactMode::Put, Some(&contact), None).is_err());
        assert!(e.contact_plan(ContactMode::Post, None, None).is_err());
    }

    #[test]
    fn test_contact_person_plans() {
        let e = endpoints();
        let list = e
            .contact_person_plan(ContactPersonMode::GetList, None, None, Some("12"))
            .unwrap();
        assert_eq!(list.method, Method::GET);
        assert_eq!(list.url, e.url("contacts/12/contactpersons"));

        let primary = e
            .contact_person_plan(ContactPersonMode::SetPrimary, None, Some("99"), None)
            .unwrap();
        assert_eq!(primary.method, Method::POST);
        assert_eq!(primary.url, e.url("contacts/contactpersons/99/primary"));

        assert!(e
            .contact_person_plan(ContactPersonMode::Get, None, Some("99"), None)
            .is_err());
    }

    #[test]
    fn test_cancel_purchase_order_plan() {
        let e = endpoints();
        let plan = e.cancel_purchase_order_plan("4400").unwrap();
        assert_eq!(plan.url, e.url("purchaseorders/4400/status/cancelled"));
        assert!(e.cancel_purchase_order_plan("  ").is_err());
    }
}
