// スキーマドメインモデル
//
// リフレクションで取得したデータベーススキーマを表現する型システム。
// SchemaSnapshot, TableDescriptor, ColumnDescriptor, ForeignKeyDescriptor を提供します。
//
// スナップショットは呼び出し元へ返却された後は不変として扱われます
// （Arcで共有され、キャッシュの無効化以外で変更されることはありません）。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// スキーマスナップショット
///
/// 単一のリフレクションパスで取得したデータベース全体（またはセレクターで
/// 絞り込んだ一部）のスキーマを表現します。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// テーブル定義のマップ（テーブル名 -> TableDescriptor）
    pub tables: HashMap<String, TableDescriptor>,
}

impl SchemaSnapshot {
    /// 空のスナップショットを作成
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    /// テーブルを追加
    pub fn add_table(&mut self, table: TableDescriptor) {
        self.tables.insert(table.name.clone(), table);
    }

    /// 指定されたテーブルが存在するか確認
    pub fn has_table(&self, table_name: &str) -> bool {
        self.tables.contains_key(table_name)
    }

    /// 指定されたテーブルを取得
    pub fn get_table(&self, table_name: &str) -> Option<&TableDescriptor> {
        self.tables.get(table_name)
    }

    /// テーブル数を取得
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// テーブル名の一覧を取得
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// セレクターで絞り込んだスナップショットを作成
    ///
    /// セレクターに含まれないテーブルを除外します。セレクター中の
    /// 存在しないテーブル名は黙って無視されます。絞り込み後の外部キーが
    /// スナップショット外のテーブルを参照することは許容されます
    /// （参照整合性は呼び出し元の責任）。
    pub fn filtered(&self, selector: &[String]) -> SchemaSnapshot {
        let tables = self
            .tables
            .iter()
            .filter(|(name, _)| selector.iter().any(|s| s == *name))
            .map(|(name, table)| (name.clone(), table.clone()))
            .collect();
        SchemaSnapshot { tables }
    }
}

impl Default for SchemaSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// テーブル定義
///
/// 単一テーブルのカラム、プライマリキー、外部キーを保持します。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// テーブル名
    pub name: String,

    /// カラム定義のマップ（カラム名 -> ColumnDescriptor）
    pub columns: HashMap<String, ColumnDescriptor>,

    /// プライマリキーのカラム名（定義順）
    pub primary_key: Vec<String>,

    /// 外部キー定義のリスト
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
}

impl TableDescriptor {
    /// 新しいテーブル定義を作成
    pub fn new(name: String) -> Self {
        Self {
            name,
            columns: HashMap::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// カラムを追加
    pub fn add_column(&mut self, name: String, column: ColumnDescriptor) {
        self.columns.insert(name, column);
    }

    /// 指定されたカラムを取得
    pub fn get_column(&self, column_name: &str) -> Option<&ColumnDescriptor> {
        self.columns.get(column_name)
    }

    /// プライマリキーを持つかどうか
    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }
}

/// カラム定義
///
/// リフレクションで取得した単一カラムの属性を表現します。
/// 型名はドライバーが報告した文字列のまま保持し、正規化は行いません。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// データ型（DB固有の型文字列）
    #[serde(rename = "type")]
    pub data_type: String,

    /// NULL許可フラグ
    pub nullable: bool,

    /// プライマリキーの一部かどうか
    pub primary_key: bool,

    /// 外部キー制約の対象かどうか
    pub foreign_key: bool,
}

/// 外部キー定義
///
/// 参照元カラムと参照先テーブル・カラムの組を表現します。
/// 複合外部キーはカラムの組ごとに1エントリーとして展開されます。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyDescriptor {
    /// 参照元カラム名
    pub column: String,

    /// 参照先テーブル名
    pub referenced_table: String,

    /// 参照先カラム名
    pub referenced_column: String,
}
