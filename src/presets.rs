// LLM 润色预设管理

use std::sync::Arc;
use thiserror::Error;

use crate::config::{LlmConfig, LlmPreset};
use crate::history::short_id;
use crate::sync::SyncCoordinator;

pub const NEW_PRESET_NAME: &str = "新预设";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresetError {
    #[error("至少需要保留一个预设")]
    LastPreset,
    #[error("预设不存在: {0}")]
    UnknownPreset(String),
}

/// 预设的可编辑字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetField {
    Name,
    SystemPrompt,
}

/// 新增空白预设并设为当前预设，返回新 ID
pub fn add_preset(llm: &mut LlmConfig) -> String {
    let preset = LlmPreset {
        id: short_id(),
        name: NEW_PRESET_NAME.to_string(),
        system_prompt: String::new(),
    };
    let id = preset.id.clone();
    llm.presets.push(preset);
    llm.active_preset_id = id.clone();
    id
}

/// 删除预设；删除的是当前预设时改选第一个
pub fn delete_preset(llm: &mut LlmConfig, id: &str) -> Result<(), PresetError> {
    if llm.presets.len() <= 1 {
        return Err(PresetError::LastPreset);
    }
    let before = llm.presets.len();
    llm.presets.retain(|p| p.id != id);
    if llm.presets.len() == before {
        return Err(PresetError::UnknownPreset(id.to_string()));
    }

    if llm.active_preset_id == id {
        llm.active_preset_id = llm.presets[0].id.clone();
    }
    Ok(())
}

pub fn select_preset(llm: &mut LlmConfig, id: &str) -> Result<(), PresetError> {
    if !llm.presets.iter().any(|p| p.id == id) {
        return Err(PresetError::UnknownPreset(id.to_string()));
    }
    llm.active_preset_id = id.to_string();
    Ok(())
}

/// 修改当前预设的名称或提示词
pub fn update_active_preset(llm: &mut LlmConfig, field: PresetField, value: &str) {
    let active_id = llm.active_preset_id.clone();
    if let Some(preset) = llm.presets.iter_mut().find(|p| p.id == active_id) {
        match field {
            PresetField::Name => preset.name = value.to_string(),
            PresetField::SystemPrompt => preset.system_prompt = value.to_string(),
        }
    }
}

// ============================================================================
// 与配置同步
// ============================================================================

pub fn handle_add_preset(coordinator: &Arc<SyncCoordinator>) -> String {
    coordinator.update_settings(|s| add_preset(&mut s.llm_config))
}

pub fn handle_delete_preset(coordinator: &Arc<SyncCoordinator>, id: &str) -> Result<(), PresetError> {
    let result = coordinator.update_settings(|s| delete_preset(&mut s.llm_config, id));
    if let Err(ref e) = result {
        tracing::warn!("删除预设失败: {}", e);
    }
    result
}

pub fn handle_select_preset(coordinator: &Arc<SyncCoordinator>, id: &str) -> Result<(), PresetError> {
    coordinator.update_settings(|s| select_preset(&mut s.llm_config, id))
}

pub fn handle_update_active_preset(coordinator: &Arc<SyncCoordinator>, field: PresetField, value: &str) {
    coordinator.update_settings(|s| update_active_preset(&mut s.llm_config, field, value));
}
