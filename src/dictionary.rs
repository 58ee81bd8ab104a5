// 词库编辑
//
// 词库是去重、去首尾空格、非空的有序列表。
// 修改通过 SyncCoordinator::update_settings 写入，随后走自动保存和热更新。

use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use crate::sync::SyncCoordinator;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DictionaryError {
    #[error("词汇不能为空")]
    Empty,
    #[error("词汇已存在: {0}")]
    Duplicate(String),
    #[error("当前没有正在编辑的词汇")]
    NotEditing,
}

/// 标准化词汇（去除首尾空格）
pub fn normalize_word(word: &str) -> String {
    word.trim().to_string()
}

/// 去首尾空格、去空、去重（保留首次出现的顺序）
pub fn normalize_words<I>(words: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    words
        .into_iter()
        .map(|w| normalize_word(&w))
        .filter(|w| !w.is_empty())
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// 追加新词，重复或为空时不修改
pub fn add_word(words: &mut Vec<String>, word: &str) -> Result<(), DictionaryError> {
    let normalized = normalize_word(word);
    if normalized.is_empty() {
        return Err(DictionaryError::Empty);
    }
    if words.contains(&normalized) {
        return Err(DictionaryError::Duplicate(normalized));
    }
    words.push(normalized);
    Ok(())
}

/// 行内编辑状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictionaryEditor {
    pub editing_index: Option<usize>,
    pub editing_value: String,
}

impl DictionaryEditor {
    pub fn start_edit(&mut self, words: &[String], index: usize) {
        self.editing_index = Some(index);
        self.editing_value = words.get(index).cloned().unwrap_or_default();
    }

    pub fn cancel_edit(&mut self) {
        self.editing_index = None;
        self.editing_value.clear();
    }

    /// 删除词条，同时保持编辑中的下标指向同一个词
    pub fn delete(&mut self, words: &mut Vec<String>, index: usize) {
        if index < words.len() {
            words.remove(index);
        }
        match self.editing_index {
            Some(editing) if editing == index => self.cancel_edit(),
            Some(editing) if index < editing => self.editing_index = Some(editing - 1),
            _ => {}
        }
    }

    /// 保存编辑
    ///
    /// 与其他词条重复时保持编辑状态并返回错误；编辑内容为空时原词保留
    pub fn save_edit(&mut self, words: &mut [String]) -> Result<(), DictionaryError> {
        let index = self.editing_index.ok_or(DictionaryError::NotEditing)?;
        let word = normalize_word(&self.editing_value);

        let duplicate = words
            .iter()
            .enumerate()
            .any(|(i, w)| i != index && *w == word);
        if duplicate {
            return Err(DictionaryError::Duplicate(word));
        }

        if !word.is_empty() {
            if let Some(slot) = words.get_mut(index) {
                *slot = word;
            }
        }
        self.cancel_edit();
        Ok(())
    }
}

// ============================================================================
// 与配置同步
// ============================================================================

/// 添加词汇；重复时显示提示
pub fn handle_add_word(coordinator: &Arc<SyncCoordinator>, word: &str) -> Result<(), DictionaryError> {
    let result = coordinator.update_settings(|s| add_word(&mut s.dictionary, word));
    if let Err(DictionaryError::Duplicate(ref w)) = result {
        tracing::debug!("词汇已存在: {}", w);
        coordinator.context().show_duplicate_hint();
    }
    result
}

pub fn handle_delete_word(coordinator: &Arc<SyncCoordinator>, index: usize) {
    let ctx = Arc::clone(coordinator.context());
    coordinator.update_settings(|s| ctx.dictionary_editor().delete(&mut s.dictionary, index));
}

pub fn handle_start_edit(coordinator: &Arc<SyncCoordinator>, index: usize) {
    let ctx = coordinator.context();
    let words = ctx.settings().dictionary;
    ctx.dictionary_editor().start_edit(&words, index);
}

pub fn handle_set_edit_value(coordinator: &Arc<SyncCoordinator>, value: &str) {
    coordinator.context().dictionary_editor().editing_value = value.to_string();
}

pub fn handle_save_edit(coordinator: &Arc<SyncCoordinator>) -> Result<(), DictionaryError> {
    let ctx = Arc::clone(coordinator.context());
    let result = coordinator.update_settings(|s| ctx.dictionary_editor().save_edit(&mut s.dictionary));
    if let Err(DictionaryError::Duplicate(_)) = result {
        ctx.show_duplicate_hint();
    }
    result
}

pub fn handle_cancel_edit(coordinator: &Arc<SyncCoordinator>) {
    coordinator.context().dictionary_editor().cancel_edit();
}
