// SQL検証結果
//
// SQL検証の合否を表現する結果値。検証の失敗は例外ではなく
// この値として呼び出し元へ返されます。

use serde::{Deserialize, Serialize};

/// 検証結果
///
/// 成功時は検証済みSQL（入力のまま、書き換えなし）を、失敗時は
/// 人間可読なエラーメッセージを保持します。sqlとerrorは排他的で、
/// 必ずどちらか一方のみが設定されます。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    /// 検証に成功したかどうか
    pub success: bool,

    /// 検証済みSQL（成功時のみ）
    pub sql: Option<String>,

    /// エラーメッセージ（失敗時のみ）
    pub error: Option<String>,
}

impl ValidationVerdict {
    /// 成功の検証結果を作成
    pub fn ok(sql: String) -> Self {
        Self {
            success: true,
            sql: Some(sql),
            error: None,
        }
    }

    /// 失敗の検証結果を作成
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            sql: None,
            error: Some(message.into()),
        }
    }

    /// 検証に成功したかどうか
    pub fn is_success(&self) -> bool {
        self.success
    }
}
