// SQL検証サービス
//
// LLMが生成したSQL候補をトークナイズし、危険な操作と未知のテーブル参照を
// 検出します。検証はデータベースI/Oを行わない純粋関数で、失敗は例外では
// なくValidationVerdictとして返されます。
//
// テーブル参照の収集はFROM句とJOIN句に続く識別子に限定しています。
// SELECTリスト中のカラム識別子まで対象にすると、既知テーブル名と
// 一致しないカラム名がすべて「不正なテーブル」として誤検出されるためです。

use crate::core::schema::SchemaSnapshot;
use crate::core::verdict::ValidationVerdict;
use sqlparser::dialect::GenericDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// 実行を拒否するSQLキーワード
///
/// キーワードとして分類されたトークンのみを対象とします。識別子や
/// 文字列リテラルにこれらの語が含まれていても拒否しません。
const DANGEROUS_KEYWORDS: [&str; 10] = [
    "DROP", "DELETE", "TRUNCATE", "ALTER", "GRANT", "REVOKE", "EXECUTE", "EXEC", "COMMIT",
    "ROLLBACK",
];

/// SQL検証サービス
///
/// 共有状態を持たず、複数のリクエストから同時に呼び出せます。
#[derive(Debug, Clone)]
pub struct SqlValidator {
    dangerous_keywords: HashSet<&'static str>,
}

impl SqlValidator {
    /// 新しいSqlValidatorを作成
    pub fn new() -> Self {
        Self {
            dangerous_keywords: DANGEROUS_KEYWORDS.iter().copied().collect(),
        }
    }

    /// SQL候補を検証
    ///
    /// 以下の順でチェックし、最初の失敗で打ち切ります。
    /// 1. トークナイズ（空入力・解釈不能な入力を拒否）
    /// 2. 危険な操作の検出
    /// 3. メタデータに存在しないテーブル参照の検出
    ///
    /// すべて通過した場合、入力SQLを書き換えずそのまま返します。
    pub fn validate(&self, sql: &str, metadata: &SchemaSnapshot) -> ValidationVerdict {
        let dialect = GenericDialect {};
        let tokens = match Tokenizer::new(&dialect, sql).tokenize() {
            Ok(tokens) => tokens,
            Err(e) => {
                debug!("SQL tokenization failed: {}", e);
                return ValidationVerdict::fail("Empty or invalid SQL");
            }
        };

        // 空白を除いた実トークン列
        let tokens: Vec<&Token> = tokens
            .iter()
            .filter(|t| !matches!(t, Token::Whitespace(_)))
            .collect();

        if tokens.is_empty() || tokens.iter().all(|t| matches!(t, Token::SemiColon)) {
            return ValidationVerdict::fail("Empty or invalid SQL");
        }

        if self.contains_dangerous_operations(&tokens) {
            return ValidationVerdict::fail("SQL contains potentially dangerous operations");
        }

        let invalid_tables = self.invalid_tables(&tokens, metadata);
        if !invalid_tables.is_empty() {
            let joined: Vec<String> = invalid_tables.into_iter().collect();
            return ValidationVerdict::fail(format!("Invalid table(s): {}", joined.join(", ")));
        }

        ValidationVerdict::ok(sql.to_string())
    }

    /// 危険な操作が含まれるかを判定
    fn contains_dangerous_operations(&self, tokens: &[&Token]) -> bool {
        tokens.iter().any(|token| match token {
            Token::Word(word) => {
                word.keyword != Keyword::NoKeyword
                    && self
                        .dangerous_keywords
                        .contains(word.value.to_uppercase().as_str())
            }
            _ => false,
        })
    }

    /// メタデータに存在しないテーブル参照を収集
    ///
    /// 返される集合はソート済みで、エラーメッセージが決定的になります。
    fn invalid_tables(&self, tokens: &[&Token], metadata: &SchemaSnapshot) -> BTreeSet<String> {
        collect_table_references(tokens)
            .into_iter()
            .filter(|name| !metadata.has_table(name))
            .collect()
    }
}

impl Default for SqlValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// FROM句・JOIN句に続くテーブル識別子を収集
///
/// 修飾名（catalog.schema.table）は最終セグメントを実名として採用し、
/// エイリアスは無視します。FROM句のカンマ区切りリストは各項目の先頭
/// 識別子を収集します。サブクエリはその内側のFROM句で再び収集されます。
fn collect_table_references(tokens: &[&Token]) -> BTreeSet<String> {
    let mut tables = BTreeSet::new();
    let mut expect_table = false;
    let mut in_from_list = false;
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i] {
            Token::Word(word) => {
                if word.keyword == Keyword::FROM {
                    expect_table = true;
                    in_from_list = true;
                } else if word.keyword == Keyword::JOIN {
                    expect_table = true;
                    in_from_list = false;
                } else if expect_table
                    && (word.keyword == Keyword::NoKeyword
                        || matches!(tokens.get(i + 1), Some(Token::Period)))
                {
                    // 修飾名を読み進め、実名（最終セグメント）を採用
                    // （publicのようにキーワード扱いされるスキーマ名も
                    // 後続のピリオドがあれば修飾子として受け入れる）
                    let mut real_name = word.value.clone();
                    while i + 2 < tokens.len() && matches!(tokens[i + 1], Token::Period) {
                        if let Token::Word(next) = tokens[i + 2] {
                            real_name = next.value.clone();
                            i += 2;
                        } else {
                            break;
                        }
                    }
                    tables.insert(real_name);
                    expect_table = false;
                } else if word.keyword != Keyword::NoKeyword {
                    // キーワードに分類された語はテーブル名として扱わない
                    if expect_table {
                        expect_table = false;
                    }
                    if in_from_list && is_clause_boundary(word.keyword) {
                        in_from_list = false;
                    }
                }
            }
            Token::Comma => {
                if in_from_list {
                    expect_table = true;
                }
            }
            Token::LParen => {
                // サブクエリや関数呼び出しの開始
                if expect_table {
                    expect_table = false;
                }
            }
            _ => {}
        }
        i += 1;
    }

    tables
}

/// FROM句のテーブルリストを終端するキーワードかどうか
fn is_clause_boundary(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::WHERE
            | Keyword::ON
            | Keyword::GROUP
            | Keyword::ORDER
            | Keyword::HAVING
            | Keyword::LIMIT
            | Keyword::OFFSET
            | Keyword::UNION
            | Keyword::EXCEPT
            | Keyword::INTERSECT
            | Keyword::WINDOW
            | Keyword::SET
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ColumnDescriptor, TableDescriptor};

    fn snapshot_with_tables(names: &[&str]) -> SchemaSnapshot {
        let mut snapshot = SchemaSnapshot::new();
        for name in names {
            let mut table = TableDescriptor::new(name.to_string());
            table.add_column(
                "id".to_string(),
                ColumnDescriptor {
                    data_type: "INTEGER".to_string(),
                    nullable: false,
                    primary_key: true,
                    foreign_key: false,
                },
            );
            table.primary_key = vec!["id".to_string()];
            snapshot.add_table(table);
        }
        snapshot
    }

    // =========================================================================
    // 空入力・解釈不能入力
    // =========================================================================

    #[test]
    fn test_empty_sql_rejected() {
        let validator = SqlValidator::new();
        let verdict = validator.validate("", &snapshot_with_tables(&["users"]));
        assert!(!verdict.is_success());
        assert_eq!(verdict.error.as_deref(), Some("Empty or invalid SQL"));
    }

    #[test]
    fn test_whitespace_only_sql_rejected() {
        let validator = SqlValidator::new();
        let verdict = validator.validate("   \n\t  ", &snapshot_with_tables(&["users"]));
        assert!(!verdict.is_success());
        assert_eq!(verdict.error.as_deref(), Some("Empty or invalid SQL"));
    }

    #[test]
    fn test_semicolons_only_rejected() {
        let validator = SqlValidator::new();
        let verdict = validator.validate(" ; ; ", &snapshot_with_tables(&["users"]));
        assert!(!verdict.is_success());
        assert_eq!(verdict.error.as_deref(), Some("Empty or invalid SQL"));
    }

    #[test]
    fn test_unterminated_string_rejected() {
        let validator = SqlValidator::new();
        let verdict =
            validator.validate("SELECT 'broken FROM users", &snapshot_with_tables(&["users"]));
        assert!(!verdict.is_success());
        assert_eq!(verdict.error.as_deref(), Some("Empty or invalid SQL"));
    }

    // =========================================================================
    // 危険な操作の検出
    // =========================================================================

    #[test]
    fn test_drop_rejected() {
        let validator = SqlValidator::new();
        let verdict = validator.validate("DROP TABLE users", &snapshot_with_tables(&["users"]));
        assert!(!verdict.is_success());
        assert!(verdict.error.unwrap().contains("dangerous operations"));
    }

    #[test]
    fn test_lowercase_drop_rejected() {
        let validator = SqlValidator::new();
        let verdict = validator.validate("drop table x", &snapshot_with_tables(&["x"]));
        assert!(!verdict.is_success());
        assert!(verdict.error.unwrap().contains("dangerous operations"));
    }

    #[test]
    fn test_delete_rejected() {
        let validator = SqlValidator::new();
        let verdict =
            validator.validate("DELETE FROM users WHERE id = 1", &snapshot_with_tables(&["users"]));
        assert!(!verdict.is_success());
        assert!(verdict.error.unwrap().contains("dangerous operations"));
    }

    #[test]
    fn test_truncate_and_alter_rejected() {
        let validator = SqlValidator::new();
        let snapshot = snapshot_with_tables(&["users"]);
        assert!(!validator.validate("TRUNCATE TABLE users", &snapshot).is_success());
        assert!(!validator
            .validate("ALTER TABLE users ADD COLUMN age INT", &snapshot)
            .is_success());
    }

    #[test]
    fn test_trailing_dangerous_statement_rejected() {
        let validator = SqlValidator::new();
        let verdict = validator.validate(
            "SELECT id FROM users; DROP TABLE users",
            &snapshot_with_tables(&["users"]),
        );
        assert!(!verdict.is_success());
        assert!(verdict.error.unwrap().contains("dangerous operations"));
    }

    #[test]
    fn test_dangerous_word_in_string_literal_allowed() {
        let validator = SqlValidator::new();
        let verdict = validator.validate(
            "SELECT id FROM users WHERE name = 'DROP'",
            &snapshot_with_tables(&["users"]),
        );
        assert!(verdict.is_success());
    }

    #[test]
    fn test_identifier_containing_keyword_allowed() {
        let validator = SqlValidator::new();
        let verdict = validator.validate(
            "SELECT dropped_at FROM users",
            &snapshot_with_tables(&["users"]),
        );
        assert!(verdict.is_success());
    }

    // =========================================================================
    // テーブル参照の検証
    // =========================================================================

    #[test]
    fn test_unknown_table_rejected() {
        let validator = SqlValidator::new();
        let verdict =
            validator.validate("SELECT * FROM ghosts", &snapshot_with_tables(&["users"]));
        assert!(!verdict.is_success());
        let error = verdict.error.unwrap();
        assert!(error.contains("Invalid table(s)"));
        assert!(error.contains("ghosts"));
    }

    #[test]
    fn test_unknown_join_table_rejected() {
        let validator = SqlValidator::new();
        let verdict = validator.validate(
            "SELECT u.id FROM users u JOIN phantoms p ON p.user_id = u.id",
            &snapshot_with_tables(&["users"]),
        );
        assert!(!verdict.is_success());
        assert!(verdict.error.unwrap().contains("phantoms"));
    }

    #[test]
    fn test_multiple_unknown_tables_sorted_in_message() {
        let validator = SqlValidator::new();
        let verdict = validator.validate(
            "SELECT * FROM zombies, ghosts",
            &snapshot_with_tables(&["users"]),
        );
        assert!(!verdict.is_success());
        assert_eq!(
            verdict.error.as_deref(),
            Some("Invalid table(s): ghosts, zombies")
        );
    }

    #[test]
    fn test_known_tables_with_aliases_allowed() {
        let validator = SqlValidator::new();
        let verdict = validator.validate(
            "SELECT u.id, o.total FROM users u JOIN orders o ON o.user_id = u.id",
            &snapshot_with_tables(&["users", "orders"]),
        );
        assert!(verdict.is_success());
    }

    #[test]
    fn test_qualified_table_name_uses_real_name() {
        let validator = SqlValidator::new();
        let verdict = validator.validate(
            "SELECT * FROM public.users",
            &snapshot_with_tables(&["users"]),
        );
        assert!(verdict.is_success());
    }

    #[test]
    fn test_comma_separated_from_list() {
        let validator = SqlValidator::new();
        let verdict = validator.validate(
            "SELECT * FROM users, orders WHERE users.id = orders.user_id",
            &snapshot_with_tables(&["users", "orders"]),
        );
        assert!(verdict.is_success());
    }

    #[test]
    fn test_subquery_table_checked() {
        let validator = SqlValidator::new();
        let verdict = validator.validate(
            "SELECT * FROM users WHERE id IN (SELECT user_id FROM ghosts)",
            &snapshot_with_tables(&["users"]),
        );
        assert!(!verdict.is_success());
        assert!(verdict.error.unwrap().contains("ghosts"));
    }

    #[test]
    fn test_where_clause_comma_does_not_collect_identifiers() {
        let validator = SqlValidator::new();
        let verdict = validator.validate(
            "SELECT * FROM users WHERE id IN (1, 2, 3)",
            &snapshot_with_tables(&["users"]),
        );
        assert!(verdict.is_success());
    }

    // =========================================================================
    // 成功パス
    // =========================================================================

    #[test]
    fn test_happy_path_returns_sql_unchanged() {
        let validator = SqlValidator::new();
        let sql = "SELECT id FROM users";
        let verdict = validator.validate(sql, &snapshot_with_tables(&["users"]));
        assert!(verdict.is_success());
        assert_eq!(verdict.sql.as_deref(), Some(sql));
        assert!(verdict.error.is_none());
    }

    #[test]
    fn test_happy_path_preserves_formatting() {
        let validator = SqlValidator::new();
        let sql = "select  id ,name\nFROM users  ";
        let verdict = validator.validate(sql, &snapshot_with_tables(&["users"]));
        assert!(verdict.is_success());
        // 書き換え・トリム・整形は一切行わない
        assert_eq!(verdict.sql.as_deref(), Some(sql));
    }
}
