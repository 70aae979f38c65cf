//! 專案與物料連結模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{normalize_optional, require_text, Result};

/// 專案狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProjectStatus {
    /// 規劃中
    #[serde(rename = "Planning")]
    Planning,
    /// 進行中
    #[default]
    #[serde(rename = "In Progress")]
    InProgress,
    /// 已完成
    #[serde(rename = "Completed")]
    Completed,
    /// 暫停
    #[serde(rename = "On Hold")]
    OnHold,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "Planning",
            ProjectStatus::InProgress => "In Progress",
            ProjectStatus::Completed => "Completed",
            ProjectStatus::OnHold => "On Hold",
        }
    }
}

/// 專案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// 專案ID
    pub id: Uuid,

    /// 專案名稱
    pub name: String,

    /// 專案代碼（不分大小寫唯一）
    pub code: String,

    /// 客戶/地點
    pub client_location: Option<String>,

    pub description: Option<String>,

    pub status: ProjectStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// 由草稿建立專案
    pub fn from_draft(draft: ProjectDraft, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            code: require_text(&draft.code, "專案代碼")?,
            name: require_text(&draft.name, "專案名稱")?,
            client_location: normalize_optional(draft.client_location),
            description: normalize_optional(draft.description),
            status: draft.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }

    /// 代碼比對（不分大小寫）
    pub fn code_matches(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code.trim())
    }
}

/// 建立專案的輸入
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub name: String,
    pub code: String,
    pub client_location: Option<String>,
    pub description: Option<String>,
    /// 未指定時為「進行中」
    pub status: Option<ProjectStatus>,
}

impl ProjectDraft {
    /// 創建新的專案草稿
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            ..Default::default()
        }
    }

    /// 建構器模式：設置客戶/地點
    pub fn with_client_location(mut self, location: impl Into<String>) -> Self {
        self.client_location = Some(location.into());
        self
    }

    /// 建構器模式：設置說明
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 建構器模式：設置狀態
    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// 專案與物料的連結
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLink {
    pub project_id: Uuid,
    pub material_id: Uuid,

    /// 專案層級的儲位覆寫
    pub default_location_override: Option<String>,

    pub linked_at: DateTime<Utc>,
}

impl MaterialLink {
    /// 創建新的連結
    pub fn new(project_id: Uuid, material_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            project_id,
            material_id,
            default_location_override: None,
            linked_at: now,
        }
    }

    /// 建構器模式：設置儲位覆寫
    pub fn with_location_override(mut self, location: Option<String>) -> Self {
        self.default_location_override = normalize_optional(location);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LedgerError;

    #[test]
    fn test_create_project_defaults_to_in_progress() {
        let project = Project::from_draft(
            ProjectDraft::new("Project A", "PROJ-A").with_client_location("Chennai"),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(project.status, ProjectStatus::InProgress);
        assert_eq!(project.client_location, Some("Chennai".to_string()));
        assert!(project.code_matches(" proj-a "));
    }

    #[test]
    fn test_project_requires_code() {
        let result = Project::from_draft(ProjectDraft::new("Project A", "  "), Utc::now());
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ProjectStatus::OnHold).unwrap();
        assert_eq!(json, "\"On Hold\"");

        let status: ProjectStatus = serde_json::from_str("\"In Progress\"").unwrap();
        assert_eq!(status, ProjectStatus::InProgress);
        assert_eq!(status.as_str(), "In Progress");
    }

    #[test]
    fn test_link_location_override() {
        let link = MaterialLink::new(Uuid::new_v4(), Uuid::new_v4(), Utc::now())
            .with_location_override(Some("  Yard 2 ".to_string()));

        assert_eq!(link.default_location_override, Some("Yard 2".to_string()));
    }
}
