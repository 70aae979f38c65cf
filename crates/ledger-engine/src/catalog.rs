//! 主檔目錄：專案、物料與專案物料連結

use chrono::{DateTime, Utc};
use ledger_core::{
    LedgerError, Material, MaterialDraft, MaterialLink, Project, ProjectDraft, ProjectStatus,
    Result, StockKey,
};
use std::collections::HashMap;
use uuid::Uuid;

/// 主檔目錄
#[derive(Debug, Default)]
pub struct Catalog {
    projects: HashMap<Uuid, Project>,
    /// 專案建立順序
    project_order: Vec<Uuid>,
    materials: HashMap<Uuid, Material>,
    links: Vec<MaterialLink>,
}

impl Catalog {
    /// 創建空目錄
    pub fn new() -> Self {
        Self::default()
    }

    /// 新增專案（代碼不分大小寫唯一）
    pub fn add_project(&mut self, draft: ProjectDraft, now: DateTime<Utc>) -> Result<Project> {
        let project = Project::from_draft(draft, now)?;
        if self.projects.values().any(|p| p.code_matches(&project.code)) {
            return Err(LedgerError::DuplicateCode(project.code));
        }
        self.project_order.push(project.id);
        self.projects.insert(project.id, project.clone());
        Ok(project)
    }

    /// 更新專案狀態
    pub fn set_project_status(
        &mut self,
        project_id: Uuid,
        status: ProjectStatus,
        now: DateTime<Utc>,
    ) -> Result<Project> {
        let project = self
            .projects
            .get_mut(&project_id)
            .ok_or(LedgerError::UnknownProject(project_id))?;
        project.status = status;
        project.updated_at = now;
        Ok(project.clone())
    }

    pub fn project(&self, project_id: Uuid) -> Result<&Project> {
        self.projects
            .get(&project_id)
            .ok_or(LedgerError::UnknownProject(project_id))
    }

    /// 全部專案（依建立順序）
    pub fn projects(&self) -> Vec<&Project> {
        self.project_order
            .iter()
            .filter_map(|id| self.projects.get(id))
            .collect()
    }

    /// 新增物料（圖號不分大小寫唯一）
    pub fn add_material(&mut self, draft: MaterialDraft, now: DateTime<Utc>) -> Result<Material> {
        let material = Material::from_draft(draft, now)?;
        self.ensure_material_code_free(&material.code, None)?;
        self.materials.insert(material.id, material.clone());
        Ok(material)
    }

    /// 更新物料描述欄位
    pub fn update_material(
        &mut self,
        material_id: Uuid,
        draft: MaterialDraft,
        now: DateTime<Utc>,
    ) -> Result<Material> {
        if !self.materials.contains_key(&material_id) {
            return Err(LedgerError::UnknownMaterial(material_id));
        }
        self.ensure_material_code_free(draft.code.trim(), Some(material_id))?;

        let material = self
            .materials
            .get_mut(&material_id)
            .ok_or(LedgerError::UnknownMaterial(material_id))?;
        material.apply(draft, now)?;
        Ok(material.clone())
    }

    /// 刪除物料；仍連結任何專案時拒絕
    ///
    /// 異動記錄的檢查由呼叫端（引擎）負責。
    pub fn remove_material(&mut self, material_id: Uuid) -> Result<Material> {
        self.material(material_id)?;
        if self.links.iter().any(|link| link.material_id == material_id) {
            return Err(LedgerError::MaterialInUse(
                "物料仍連結至一個或多個專案".to_string(),
            ));
        }
        self.materials
            .remove(&material_id)
            .ok_or(LedgerError::UnknownMaterial(material_id))
    }

    pub fn material(&self, material_id: Uuid) -> Result<&Material> {
        self.materials
            .get(&material_id)
            .ok_or(LedgerError::UnknownMaterial(material_id))
    }

    /// 全部物料（依建立時間、圖號排序）
    pub fn materials(&self) -> Vec<&Material> {
        let mut materials: Vec<&Material> = self.materials.values().collect();
        materials.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.code.cmp(&b.code))
        });
        materials
    }

    /// 連結物料至專案
    pub fn link(
        &mut self,
        project_id: Uuid,
        material_id: Uuid,
        location_override: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<MaterialLink> {
        self.project(project_id)?;
        self.material(material_id)?;
        if self.is_linked(project_id, material_id) {
            return Err(LedgerError::AlreadyLinked {
                project_id,
                material_id,
            });
        }
        let link = MaterialLink::new(project_id, material_id, now)
            .with_location_override(location_override);
        self.links.push(link.clone());
        Ok(link)
    }

    /// 取消連結；異動記錄的檢查由呼叫端負責
    pub fn unlink(&mut self, project_id: Uuid, material_id: Uuid) -> Result<MaterialLink> {
        self.project(project_id)?;
        self.material(material_id)?;
        let position = self
            .links
            .iter()
            .position(|link| link.project_id == project_id && link.material_id == material_id)
            .ok_or(LedgerError::NotLinked {
                project_id,
                material_id,
            })?;
        Ok(self.links.remove(position))
    }

    pub fn is_linked(&self, project_id: Uuid, material_id: Uuid) -> bool {
        self.links
            .iter()
            .any(|link| link.project_id == project_id && link.material_id == material_id)
    }

    /// 專案的物料連結（依連結順序）
    pub fn links_for_project(&self, project_id: Uuid) -> Result<Vec<&MaterialLink>> {
        self.project(project_id)?;
        Ok(self
            .links
            .iter()
            .filter(|link| link.project_id == project_id)
            .collect())
    }

    /// 全部物料連結
    pub fn links(&self) -> &[MaterialLink] {
        &self.links
    }

    /// 驗證庫存鍵可接受異動，回傳物料
    ///
    /// 專案範圍的鍵要求專案存在且物料已連結；一般倉只要求物料存在。
    pub fn ensure_stock_key(&self, key: &StockKey) -> Result<&Material> {
        let material = self.material(key.material_id)?;
        if let Some(project_id) = key.project_id {
            self.project(project_id)?;
            if !self.is_linked(project_id, key.material_id) {
                return Err(LedgerError::NotLinked {
                    project_id,
                    material_id: key.material_id,
                });
            }
        }
        Ok(material)
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    fn ensure_material_code_free(&self, code: &str, except: Option<Uuid>) -> Result<()> {
        let taken = self
            .materials
            .values()
            .any(|m| Some(m.id) != except && m.code_matches(code));
        if taken {
            return Err(LedgerError::DuplicateCode(code.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (Catalog, Uuid, Uuid) {
        let mut catalog = Catalog::new();
        let project = catalog
            .add_project(ProjectDraft::new("Project A", "PROJ-A"), Utc::now())
            .unwrap();
        let material = catalog
            .add_material(MaterialDraft::new("Steel Rod", "ST-001"), Utc::now())
            .unwrap();
        (catalog, project.id, material.id)
    }

    #[test]
    fn test_duplicate_codes_rejected() {
        let (mut catalog, _, _) = seeded();

        let dup_project = catalog.add_project(ProjectDraft::new("Other", "proj-a"), Utc::now());
        assert!(matches!(dup_project, Err(LedgerError::DuplicateCode(_))));

        let dup_material = catalog.add_material(MaterialDraft::new("Rod", " st-001 "), Utc::now());
        assert!(matches!(dup_material, Err(LedgerError::DuplicateCode(_))));
    }

    #[test]
    fn test_update_material_code_uniqueness() {
        let (mut catalog, _, material_id) = seeded();
        let other = catalog
            .add_material(MaterialDraft::new("Cement", "CM-01"), Utc::now())
            .unwrap();

        // 保留自己的代碼可以
        let updated = catalog
            .update_material(material_id, MaterialDraft::new("Steel Rod 12", "ST-001"), Utc::now())
            .unwrap();
        assert_eq!(updated.name, "Steel Rod 12");

        // 使用他人代碼不行
        let result =
            catalog.update_material(other.id, MaterialDraft::new("Cement", "st-001"), Utc::now());
        assert!(matches!(result, Err(LedgerError::DuplicateCode(_))));
    }

    #[test]
    fn test_link_and_unlink() {
        let (mut catalog, project_id, material_id) = seeded();

        catalog
            .link(project_id, material_id, Some("Yard".to_string()), Utc::now())
            .unwrap();
        assert!(catalog.is_linked(project_id, material_id));
        assert!(matches!(
            catalog.link(project_id, material_id, None, Utc::now()),
            Err(LedgerError::AlreadyLinked { .. })
        ));
        assert_eq!(catalog.links_for_project(project_id).unwrap().len(), 1);

        // 仍有連結時不可刪除物料
        assert!(matches!(
            catalog.remove_material(material_id),
            Err(LedgerError::MaterialInUse(_))
        ));

        catalog.unlink(project_id, material_id).unwrap();
        assert!(matches!(
            catalog.unlink(project_id, material_id),
            Err(LedgerError::NotLinked { .. })
        ));
        assert!(catalog.remove_material(material_id).is_ok());
        assert_eq!(catalog.material_count(), 0);
    }

    #[test]
    fn test_ensure_stock_key() {
        let (mut catalog, project_id, material_id) = seeded();
        let key = StockKey::new(project_id, material_id);

        assert!(matches!(
            catalog.ensure_stock_key(&key),
            Err(LedgerError::NotLinked { .. })
        ));
        assert!(catalog.ensure_stock_key(&StockKey::general(material_id)).is_ok());

        catalog.link(project_id, material_id, None, Utc::now()).unwrap();
        assert_eq!(catalog.ensure_stock_key(&key).unwrap().id, material_id);

        let unknown_project = StockKey::new(Uuid::new_v4(), material_id);
        assert!(matches!(
            catalog.ensure_stock_key(&unknown_project),
            Err(LedgerError::UnknownProject(_))
        ));
        let unknown_material = StockKey::general(Uuid::new_v4());
        assert!(matches!(
            catalog.ensure_stock_key(&unknown_material),
            Err(LedgerError::UnknownMaterial(_))
        ));
    }

    #[test]
    fn test_project_order_and_status() {
        let (mut catalog, first, _) = seeded();
        let second = catalog
            .add_project(ProjectDraft::new("Project B", "PROJ-B"), Utc::now())
            .unwrap();

        let ids: Vec<Uuid> = catalog.projects().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first, second.id]);

        let updated = catalog
            .set_project_status(second.id, ProjectStatus::OnHold, Utc::now())
            .unwrap();
        assert_eq!(updated.status, ProjectStatus::OnHold);
        assert!(matches!(
            catalog.set_project_status(Uuid::new_v4(), ProjectStatus::Completed, Utc::now()),
            Err(LedgerError::UnknownProject(_))
        ));
    }
}
