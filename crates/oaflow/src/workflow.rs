// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow verbs on top of an authenticated [`OaSession`].
//!
//! Each verb is a path plus payload contract; the vendor reply is returned
//! as-is unless noted.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::OaError;
use crate::session::{OaRequest, OaSession};

const PA_SERVICE: &str = "/api/workflow/paService";

fn pa(verb: &str) -> String {
    format!("{PA_SERVICE}/{verb}")
}

/// Which personal request list to page through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Todo,
    Doing,
    Unread,
    Rejected,
    Handled,
}

impl ListKind {
    fn segment(self) -> &'static str {
        match self {
            Self::Todo => "ToDo",
            Self::Doing => "Doing",
            Self::Unread => "ToBeRead",
            Self::Rejected => "BeReject",
            Self::Handled => "Handled",
        }
    }

    pub fn count_path(self) -> String {
        pa(&format!("get{}WorkflowRequestCount", self.segment()))
    }

    pub fn list_path(self) -> String {
        pa(&format!("get{}WorkflowRequestList", self.segment()))
    }
}

/// Search conditions for the personal lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    /// Comma-separated workflow ids; always sent, possibly empty.
    pub workflow_ids: String,
    pub archived: Option<bool>,
    pub node_type: Option<String>,
    pub level: Option<String>,
}

impl ListFilter {
    pub fn for_workflows(ids: impl Into<String>) -> Self {
        Self { workflow_ids: ids.into(), ..Self::default() }
    }

    fn conditions(&self) -> String {
        let mut c = Map::new();
        c.insert("workflowIds".into(), Value::String(self.workflow_ids.clone()));
        if let Some(archived) = self.archived {
            c.insert("isArchive".into(), Value::String(if archived { "1" } else { "0" }.into()));
        }
        if let Some(node_type) = &self.node_type {
            c.insert("nodeType".into(), Value::String(node_type.clone()));
        }
        if let Some(level) = &self.level {
            c.insert("requestLevel".into(), Value::String(level.clone()));
        }
        Value::Object(c).to_string()
    }
}

/// One page of a paged listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<Value>,
    pub page: u32,
    pub total: u64,
}

/// True when `page` starts at or beyond `total` items.
pub fn page_is_past_end(page: u32, page_size: u32, total: u64) -> bool {
    u64::from(page.max(1) - 1) * u64::from(page_size) >= total
}

/// Workflows the user may start, grouped under their category name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowCategory {
    pub name: String,
    pub workflows: Vec<Value>,
}

/// Sort by `workflowTypeName` then group consecutive entries. Entries with
/// the same category keep their relative order.
pub fn group_by_category(mut entries: Vec<Value>) -> Vec<WorkflowCategory> {
    fn category(v: &Value) -> String {
        match v.get("workflowTypeName") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    entries.sort_by_key(category);
    let mut groups: Vec<WorkflowCategory> = Vec::new();
    for entry in entries {
        let name = category(&entry);
        match groups.last_mut() {
            Some(group) if group.name == name => group.workflows.push(entry),
            _ => groups.push(WorkflowCategory { name, workflows: vec![entry] }),
        }
    }
    groups
}

/// Payload for starting a new request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRequest {
    pub workflow_id: String,
    pub request_name: String,
    /// `[{fieldName, fieldValue}, ..]` for the main form.
    pub main_data: Value,
    pub detail_data: Option<Value>,
    pub remark: Option<String>,
    pub request_level: Option<String>,
    pub other_params: Option<Value>,
}

impl NewRequest {
    fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("workflowId".to_owned(), self.workflow_id.clone()),
            ("requestName".to_owned(), self.request_name.clone()),
            ("mainData".to_owned(), self.main_data.to_string()),
        ];
        if let Some(detail) = &self.detail_data {
            params.push(("detailData".to_owned(), detail.to_string()));
        }
        if let Some(remark) = &self.remark {
            params.push(("remark".to_owned(), remark.clone()));
        }
        if let Some(level) = &self.request_level {
            params.push(("requestLevel".to_owned(), level.clone()));
        }
        if let Some(other) = &self.other_params {
            params.push(("otherParams".to_owned(), other.to_string()));
        }
        params
    }
}

/// How [`Workflow::transmit`] hands a request on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardMode {
    /// Copy to recipients for information.
    Forward,
    /// Ask recipients for an opinion.
    Consult,
    /// Hand ownership to exactly one recipient.
    Transfer,
}

impl ForwardMode {
    pub fn flag(self) -> u8 {
        match self {
            Self::Forward => 1,
            Self::Consult => 2,
            Self::Transfer => 3,
        }
    }
}

impl TryFrom<u8> for ForwardMode {
    type Error = OaError;

    fn try_from(flag: u8) -> Result<Self, Self::Error> {
        match flag {
            1 => Ok(Self::Forward),
            2 => Ok(Self::Consult),
            3 => Ok(Self::Transfer),
            other => Err(OaError::usage(format!("unknown forward flag {other}"))),
        }
    }
}

/// Labels the OA UI shows for each resource `type`.
pub fn resource_type_name(kind: i64) -> Option<&'static str> {
    match kind {
        1 => Some("相关流程"),
        2 => Some("相关文档"),
        3 => Some("相关附件"),
        _ => None,
    }
}

/// Workflow verbs for the session's registered user.
pub struct Workflow<'s> {
    session: &'s mut OaSession,
}

impl OaSession {
    pub fn workflow(&mut self) -> Workflow<'_> {
        Workflow { session: self }
    }
}

impl Workflow<'_> {
    /// Count, then fetch one page unless it lies past the end.
    pub async fn list_page(
        &mut self,
        kind: ListKind,
        filter: &ListFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Page, OaError> {
        let page = page.max(1);
        let conditions = filter.conditions();

        let count =
            self.session.post_text(OaRequest::post(kind.count_path()).param("conditions", &conditions)).await?;
        let total: u64 = count
            .trim()
            .parse()
            .map_err(|_| OaError::Protocol { body: count.clone() })?;

        if page_is_past_end(page, page_size, total) {
            debug!(?kind, page, total, "page past end, skipping list call");
            return Ok(Page { items: Vec::new(), page, total });
        }

        let value = self
            .session
            .post_json(
                OaRequest::post(kind.list_path())
                    .param("conditions", conditions)
                    .param("pageNo", page.to_string())
                    .param("pageSize", page_size.to_string()),
            )
            .await?;
        let items = match value {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => return Err(OaError::Protocol { body: other.to_string() }),
        };
        Ok(Page { items, page, total })
    }

    pub async fn todo(&mut self, filter: &ListFilter, page: u32, size: u32) -> Result<Page, OaError> {
        self.list_page(ListKind::Todo, filter, page, size).await
    }

    pub async fn handled(&mut self, filter: &ListFilter, page: u32, size: u32) -> Result<Page, OaError> {
        self.list_page(ListKind::Handled, filter, page, size).await
    }

    /// Workflows the user may create, optionally restricted to category ids.
    pub async fn create_list(
        &mut self,
        type_ids: Option<&str>,
    ) -> Result<Vec<WorkflowCategory>, OaError> {
        let mut conditions = Map::new();
        if let Some(ids) = type_ids {
            conditions.insert("wfTypeIds".into(), Value::String(ids.to_owned()));
        }
        let value = self
            .session
            .post_json(
                OaRequest::post(pa("getCreateWorkflowList"))
                    .param("conditions", Value::Object(conditions).to_string()),
            )
            .await?;
        match value {
            Value::Array(entries) => Ok(group_by_category(entries)),
            other => Err(OaError::Protocol { body: other.to_string() }),
        }
    }

    /// Start a request; returns the new request id.
    pub async fn submit(&mut self, request: &NewRequest) -> Result<String, OaError> {
        let value = self
            .session
            .post_json(OaRequest::post(pa("doCreateRequest")).params(request.params()))
            .await?;
        match value.pointer("/data/requestid") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(OaError::Protocol { body: value.to_string() }),
        }
    }

    /// Approve / submit the current node. `extras` are merged into the form
    /// and override the defaults.
    pub async fn review(
        &mut self,
        request_id: &str,
        remark: &str,
        extras: &[(&str, &str)],
    ) -> Result<Value, OaError> {
        let mut params = vec![
            ("otherParams".to_owned(), "{}".to_owned()),
            ("remark".to_owned(), remark.to_owned()),
            ("requestId".to_owned(), request_id.to_owned()),
        ];
        for (key, value) in extras {
            match params.iter_mut().find(|(k, _)| k == key) {
                Some(slot) => slot.1 = (*value).to_owned(),
                None => params.push(((*key).to_owned(), (*value).to_owned())),
            }
        }
        self.session.post_json(OaRequest::post(pa("submitRequest")).params(params)).await
    }

    /// Send the request back, to `node_id` when given.
    pub async fn reject(
        &mut self,
        request_id: &str,
        node_id: Option<&str>,
        remark: &str,
    ) -> Result<Value, OaError> {
        let other_params = match node_id.filter(|n| !n.is_empty()) {
            Some(node) => {
                let node: i64 = node
                    .trim()
                    .parse()
                    .map_err(|_| OaError::usage(format!("reject node id is not an integer: {node}")))?;
                json!({ "RejectToType": 0, "RejectToNodeid": node }).to_string()
            }
            None => "{}".to_owned(),
        };
        self.session
            .post_json(
                OaRequest::post(pa("rejectRequest"))
                    .param("otherParams", other_params)
                    .param("remark", remark)
                    .param("requestId", request_id),
            )
            .await
    }

    /// Forward, consult or transfer. `recipients` is a comma-separated list
    /// of OA user ids.
    pub async fn transmit(
        &mut self,
        request_id: &str,
        mode: ForwardMode,
        recipients: &str,
        remark: &str,
    ) -> Result<Value, OaError> {
        if recipients.split(',').any(|r| r.trim().is_empty()) {
            return Err(OaError::BusinessRule(format!("blank recipient in {recipients:?}")));
        }
        let count = recipients.split(',').count();
        if mode == ForwardMode::Transfer && count > 1 {
            return Err(OaError::BusinessRule("a transfer can only go to one user".to_owned()));
        }
        self.session
            .post_json(
                OaRequest::post(pa("forwardRequest"))
                    .param("forwardFlag", mode.flag().to_string())
                    .param("forwardResourceIds", recipients)
                    .param("otherParams", "{}")
                    .param("remark", remark)
                    .param("requestId", request_id),
            )
            .await
    }

    /// Force-withdraw a request the user submitted.
    pub async fn recover(&mut self, request_id: &str) -> Result<Value, OaError> {
        self.session
            .post_json(OaRequest::post(pa("doForceDrawBack")).param("requestId", request_id))
            .await
    }

    pub async fn status(&mut self, request_id: &str) -> Result<Value, OaError> {
        self.by_request_id("getRequestStatus", request_id).await
    }

    pub async fn operator_info(&mut self, request_id: &str) -> Result<Value, OaError> {
        self.by_request_id("getRequestOperatorInfo", request_id).await
    }

    pub async fn info(&mut self, request_id: &str) -> Result<Value, OaError> {
        self.by_request_id("getWorkflowRequest", request_id).await
    }

    /// Related workflows, documents and attachments; each entry gains a
    /// `typeName` label.
    pub async fn resources(&mut self, request_id: &str) -> Result<Value, OaError> {
        let mut value = self.by_request_id("getRequestResources", request_id).await?;
        if let Some(Value::Array(items)) = value.get_mut("data") {
            for item in items.iter_mut() {
                let name = item.get("type").and_then(Value::as_i64).and_then(resource_type_name);
                if let (Some(name), Some(obj)) = (name, item.as_object_mut()) {
                    obj.insert("typeName".into(), Value::String(name.to_owned()));
                }
            }
        }
        Ok(value)
    }

    /// Approval remarks, paged by the vendor.
    pub async fn remarks(
        &mut self,
        request_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Value, OaError> {
        let other = json!({ "pageSize": page_size, "pageNumber": page.max(1) });
        self.session
            .get_json(
                OaRequest::get(pa("getRequestLog"))
                    .param("requestId", request_id)
                    .param("otherParams", other.to_string()),
            )
            .await
    }

    /// Flow chart page URL. When SSO is configured and the session was
    /// registered by work code, a one-time login token is appended.
    pub async fn chart_url(&mut self, request_id: &str) -> Result<String, OaError> {
        let value = self
            .session
            .get_json(OaRequest::get(pa("getRequestFlowChart")).param("requestid", request_id))
            .await?;
        let url = value
            .pointer("/data/chartUrl")
            .and_then(Value::as_str)
            .ok_or_else(|| OaError::Protocol { body: value.to_string() })?
            .trim()
            .to_owned();

        let login_id = self.session.login_id().map(str::to_owned);
        match login_id {
            Some(login_id) if self.session.sso_enabled() => {
                let sso = self.session.sso_token(&login_id).await?;
                Ok(format!("{url}&ssoToken={sso}"))
            }
            _ => Ok(url),
        }
    }

    /// Flow chart definition as raw XML.
    pub async fn chart_xml(&mut self, request_id: &str) -> Result<String, OaError> {
        let req = OaRequest::get(pa("getRequestFlowChartXml")).param("requestid", request_id);
        Ok(self.session.request(req.text()).await?.into_text())
    }

    async fn by_request_id(&mut self, verb: &str, request_id: &str) -> Result<Value, OaError> {
        self.session.get_json(OaRequest::get(pa(verb)).param("requestId", request_id)).await
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
