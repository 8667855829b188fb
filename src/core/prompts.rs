// プロンプトテンプレート管理
//
// SQL生成プロンプトのテンプレートと変数展開を提供します。
// テンプレート中の `$variable` を与えられた変数で置換します。
// 未定義の変数はそのまま残します（欠落でエラーにはしません）。

use std::collections::HashMap;

/// SQL生成のデフォルトプロンプトテンプレート
const SQL_GENERATION_TEMPLATE: &str = "You are an expert SQL generator. Generate valid SQL queries based on \
natural language input and database schema metadata. The target database \
type is $database_type. Return only valid SQL in a JSON response with a \
'sql' key.\n\n\
Additional context: $context\n\
Schema metadata: $metadata\n\
Query: $query";

/// プロンプトテンプレート
///
/// `$name` 形式のプレースホルダーを持つテンプレート文字列を保持します。
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// 新しいテンプレートを作成
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// テンプレートを変数で展開
    ///
    /// 変数名は長いものから順に置換し、`$database_type` が `$database` に
    /// 部分一致で壊されることを防ぎます。
    pub fn render(&self, variables: &HashMap<String, String>) -> String {
        let mut names: Vec<&String> = variables.keys().collect();
        names.sort_by_key(|name| std::cmp::Reverse(name.len()));

        let mut rendered = self.template.clone();
        for name in names {
            let placeholder = format!("${}", name);
            rendered = rendered.replace(&placeholder, &variables[name]);
        }
        rendered
    }
}

/// プロンプトマネージャー
///
/// 名前付きテンプレートの集合を管理します。デフォルトで
/// `sql_generation` テンプレートを保持します。
#[derive(Debug, Clone)]
pub struct PromptManager {
    prompts: HashMap<String, PromptTemplate>,
}

impl PromptManager {
    /// デフォルトテンプレートを持つマネージャーを作成
    pub fn new() -> Self {
        let mut prompts = HashMap::new();
        prompts.insert(
            "sql_generation".to_string(),
            PromptTemplate::new(SQL_GENERATION_TEMPLATE),
        );
        Self { prompts }
    }

    /// テンプレートを取得
    pub fn get_prompt(&self, name: &str) -> Option<&PromptTemplate> {
        self.prompts.get(name)
    }

    /// テンプレートを追加（同名は上書き）
    pub fn add_prompt(&mut self, name: impl Into<String>, template: impl Into<String>) {
        self.prompts.insert(name.into(), PromptTemplate::new(template));
    }

    /// テンプレートを展開
    pub fn render_prompt(&self, name: &str, variables: &HashMap<String, String>) -> Option<String> {
        self.get_prompt(name).map(|t| t.render(variables))
    }
}

impl Default for PromptManager {
    fn default() -> Self {
        Self::new()
    }
}
