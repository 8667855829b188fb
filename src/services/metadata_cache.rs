// メタデータキャッシュサービス
//
// スキーマリフレクションの結果をセレクター単位でキャッシュします。
// リフレクションはデータベース全体のスキーマを読むため高コストであり、
// 同じテーブル集合を使うリクエスト間で結果を再利用します。
//
// キャッシュはこの構造体が所有する明示的な状態で、グローバル変数は
// 使いません。スキーマ変更による自動無効化は行わず、invalidate() に
// よる全クリアのみを提供します（鮮度は呼び出し元の責任）。

use crate::adapters::database::Database;
use crate::adapters::introspector::{create_introspector, SchemaIntrospector};
use crate::core::config::DatabaseType;
use crate::core::error::MetadataError;
use crate::core::schema::SchemaSnapshot;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// キャッシュキー
///
/// Noneは「全テーブル」を表し、いかなる非空セレクターとも異なるキーです。
/// セレクターはソート・重複除去してから使用します。
type CacheKey = Option<Vec<String>>;

/// メタデータキャッシュ
pub struct MetadataCache {
    introspector: Box<dyn SchemaIntrospector>,
    entries: Mutex<HashMap<CacheKey, Arc<SchemaSnapshot>>>,
}

impl MetadataCache {
    /// データベース種別に応じたキャッシュを作成
    pub fn new(database_type: DatabaseType) -> Self {
        Self {
            introspector: create_introspector(database_type),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// スキーマスナップショットを取得
    ///
    /// 同じ正規化キーに対する2回目以降の呼び出しはリフレクションを
    /// 行いません。ミス時はデータベース全体をリフレクションし、
    /// セレクターで絞り込んだ結果をキャッシュに格納します。
    ///
    /// ロックはリフレクション中には保持しません。同一キーへの同時
    /// ミスは冗長なリフレクションを行うことがありますが、書き込みは
    /// 同値の置き換えであるため結果は変わりません（後勝ち）。
    pub async fn get_schema(
        &self,
        db: &dyn Database,
        selector: Option<&[String]>,
    ) -> Result<Arc<SchemaSnapshot>, MetadataError> {
        let key = canonical_key(selector);

        if let Some(snapshot) = self.lookup(&key) {
            debug!("Metadata cache hit for key {:?}", key);
            return Ok(snapshot);
        }

        debug!("Metadata cache miss for key {:?}, reflecting schema", key);
        let full = self
            .introspector
            .snapshot(db)
            .await
            .map_err(|e| MetadataError::Reflection {
                cause: format!("{:#}", e),
            })?;

        let snapshot = match &key {
            Some(selector) => Arc::new(full.filtered(selector)),
            None => Arc::new(full),
        };

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// キャッシュを全クリア
    ///
    /// 常に成功します。次の get_schema 呼び出しは必ず再リフレクション
    /// します。
    pub fn invalidate(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let count = entries.len();
        entries.clear();
        info!("Metadata cache invalidated ({} entries cleared)", count);
    }

    /// キャッシュ済みエントリー数を取得
    pub fn entry_count(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn lookup(&self, key: &CacheKey) -> Option<Arc<SchemaSnapshot>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }
}

/// セレクターを正規化してキャッシュキーに変換
///
/// 順序は意味を持たないためソートし、重複を除去します。空のセレクターは
/// 「全テーブル」と同じキーとして扱います。
fn canonical_key(selector: Option<&[String]>) -> CacheKey {
    match selector {
        Some(names) if !names.is_empty() => {
            let mut sorted: Vec<String> = names.to_vec();
            sorted.sort();
            sorted.dedup();
            Some(sorted)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    // =========================================================================
    // canonical_key テスト
    // =========================================================================

    #[test]
    fn test_canonical_key_none() {
        assert_eq!(canonical_key(None), None);
    }

    #[test]
    fn test_canonical_key_empty_selector_is_all_tables() {
        assert_eq!(canonical_key(Some(&[])), None);
    }

    #[test]
    fn test_canonical_key_order_insignificant() {
        let ba = names(&["b", "a"]);
        let ab = names(&["a", "b"]);
        assert_eq!(canonical_key(Some(&ba)), canonical_key(Some(&ab)));
    }

    #[test]
    fn test_canonical_key_deduplicates() {
        let dup = names(&["a", "a", "b"]);
        let ab = names(&["a", "b"]);
        assert_eq!(canonical_key(Some(&dup)), canonical_key(Some(&ab)));
    }

    #[test]
    fn test_canonical_key_distinct_from_all_tables() {
        let a = names(&["a"]);
        assert_ne!(canonical_key(Some(&a)), None);
    }
}
