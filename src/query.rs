//! Typed store queries.
//!
//! A [`Query`] names a table or view, the columns to select, a list of
//! predicates, an ordering and optional limit/offset. Queries are plain data:
//! they can be built and inspected without a live store, and every store
//! backend consumes them through a single `execute` call.

use serde_json::Value;

/// A single predicate on a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Neq(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    In(String, Vec<Value>),
    IsNull(String),
    NotNull(String),
    /// Case-insensitive substring match.
    Contains(String, String),
    /// Any of the nested predicates.
    Or(Vec<Filter>),
}

impl Filter {
    /// Column the predicate applies to; `None` for `Or` groups.
    fn column(&self) -> Option<&str> {
        match self {
            Filter::Eq(col, _)
            | Filter::Neq(col, _)
            | Filter::Gt(col, _)
            | Filter::Gte(col, _)
            | Filter::Lt(col, _)
            | Filter::Lte(col, _)
            | Filter::In(col, _)
            | Filter::IsNull(col)
            | Filter::NotNull(col)
            | Filter::Contains(col, _) => Some(col),
            Filter::Or(_) => None,
        }
    }

    /// Render as a top-level `col=op.value` parameter.
    fn render_condition(&self) -> (String, String) {
        let key = self.column().unwrap_or("or").to_string();
        (key, self.render_operation(false))
    }

    /// Render as a member of an `or=(..)` group: `col.op.value`.
    fn render_nested(&self) -> String {
        match self.column() {
            Some(col) => format!("{}.{}", col, self.render_operation(true)),
            None => format!("or{}", self.render_operation(true)),
        }
    }

    /// `op.value`, or the parenthesised members of an `Or` group. Nested
    /// string operands are quoted when they hold reserved characters.
    fn render_operation(&self, nested: bool) -> String {
        let operand = |v: &Value| {
            let raw = render_value(v);
            if nested && v.is_string() {
                quote_reserved(&raw)
            } else {
                raw
            }
        };

        match self {
            Filter::Eq(_, v) => format!("eq.{}", operand(v)),
            Filter::Neq(_, v) => format!("neq.{}", operand(v)),
            Filter::Gt(_, v) => format!("gt.{}", operand(v)),
            Filter::Gte(_, v) => format!("gte.{}", operand(v)),
            Filter::Lt(_, v) => format!("lt.{}", operand(v)),
            Filter::Lte(_, v) => format!("lte.{}", operand(v)),
            Filter::In(_, values) => {
                let list: Vec<String> = values.iter().map(render_list_value).collect();
                format!("in.({})", list.join(","))
            }
            Filter::IsNull(_) => "is.null".to_string(),
            Filter::NotNull(_) => "not.is.null".to_string(),
            Filter::Contains(_, needle) => {
                let pattern = format!("*{}*", escape_like(needle));
                if nested {
                    format!("ilike.{}", quote_reserved(&pattern))
                } else {
                    format!("ilike.{}", pattern)
                }
            }
            Filter::Or(filters) => format!("({})", render_group(filters)),
        }
    }
}

fn render_group(filters: &[Filter]) -> String {
    filters
        .iter()
        .map(Filter::render_nested)
        .collect::<Vec<_>>()
        .join(",")
}

fn render_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Values inside `in.(..)` lists are quoted when they contain reserved
/// characters.
fn render_list_value(v: &Value) -> String {
    let raw = render_value(v);
    if v.is_string() {
        quote_reserved(&raw)
    } else {
        raw
    }
}

/// Double-quote `raw` when it holds a character PostgREST reserves inside
/// `in.(..)` lists and `or=(..)` groups.
fn quote_reserved(raw: &str) -> String {
    if raw.contains([',', '.', ':', '(', ')', '"', '\\', ' ']) {
        format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        raw.to_string()
    }
}

/// Needle as sent inside an ilike pattern: `*` is dropped because the store
/// reads it as `%`; `%`, `_` and `\` are escaped so they match literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for ch in like_needle(needle).chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// The literal text a `Contains` filter matches, identical for every backend.
pub(crate) fn like_needle(needle: &str) -> String {
    needle.replace('*', "")
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// One ordering key. Nulls always sort last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

/// A complete read query against one table or view.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    /// Empty means every column.
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub order: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Query {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Eq(column.to_string(), value.into()))
    }

    pub fn gt(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Gt(column.to_string(), value.into()))
    }

    pub fn lt(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Lt(column.to_string(), value.into()))
    }

    pub fn gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Gte(column.to_string(), value.into()))
    }

    pub fn lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Lte(column.to_string(), value.into()))
    }

    pub fn is_in<V: Into<Value>>(self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.filter(Filter::In(column.to_string(), values))
    }

    pub fn not_null(self, column: &str) -> Self {
        self.filter(Filter::NotNull(column.to_string()))
    }

    pub fn or(self, filters: Vec<Filter>) -> Self {
        self.filter(Filter::Or(filters))
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order.push(OrderBy {
            column: column.to_string(),
            direction,
        });
        self
    }

    pub fn asc(self, column: &str) -> Self {
        self.order_by(column, Direction::Asc)
    }

    pub fn desc(self, column: &str) -> Self {
        self.order_by(column, Direction::Desc)
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Render the query as PostgREST query-string parameters.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        let select = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(",")
        };
        params.push(("select".to_string(), select));

        for filter in &self.filters {
            params.push(filter.render_condition());
        }

        if !self.order.is_empty() {
            let order: Vec<String> = self
                .order
                .iter()
                .map(|o| {
                    let dir = match o.direction {
                        Direction::Asc => "asc",
                        Direction::Desc => "desc",
                    };
                    format!("{}.{}.nullslast", o.column, dir)
                })
                .collect();
            params.push(("order".to_string(), order.join(",")));
        }

        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Vec<&'a str> {
        params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn test_select_defaults_to_star() {
        let params = Query::table("teams").to_params();
        assert_eq!(params, vec![("select".to_string(), "*".to_string())]);
    }

    #[test]
    fn test_filters_order_and_limit() {
        let q = Query::table("games")
            .select(&["id", "week", "start_date"])
            .eq("season", 2025)
            .eq("season_type", "regular")
            .gte("week", 2)
            .asc("start_date")
            .asc("id")
            .limit(50)
            .offset(100);

        let params = q.to_params();
        assert_eq!(param(&params, "select"), vec!["id,week,start_date"]);
        assert_eq!(param(&params, "season"), vec!["eq.2025"]);
        assert_eq!(param(&params, "season_type"), vec!["eq.regular"]);
        assert_eq!(param(&params, "week"), vec!["gte.2"]);
        assert_eq!(
            param(&params, "order"),
            vec!["start_date.asc.nullslast,id.asc.nullslast"]
        );
        assert_eq!(param(&params, "limit"), vec!["50"]);
        assert_eq!(param(&params, "offset"), vec!["100"]);
    }

    #[test]
    fn test_in_list_quotes_reserved_values() {
        let q = Query::table("rankings").is_in("poll", ["AP Top 25", "Coaches"]);
        let params = q.to_params();
        assert_eq!(param(&params, "poll"), vec!["in.(\"AP Top 25\",Coaches)"]);
    }

    #[test]
    fn test_or_group_with_contains() {
        let q = Query::table("players").or(vec![
            Filter::Contains("name".into(), "ala".into()),
            Filter::Contains("team".into(), "ala".into()),
        ]);
        let params = q.to_params();
        assert_eq!(
            param(&params, "or"),
            vec!["(name.ilike.*ala*,team.ilike.*ala*)"]
        );
    }

    #[test]
    fn test_null_checks() {
        let q = Query::table("rankings")
            .not_null("rank")
            .filter(Filter::IsNull("conference".into()));
        let params = q.to_params();
        assert_eq!(param(&params, "rank"), vec!["not.is.null"]);
        assert_eq!(param(&params, "conference"), vec!["is.null"]);
    }

    #[test]
    fn test_contains_strips_wildcards() {
        let q = Query::table("players").filter(Filter::Contains("name".into(), "a*b%".into()));
        assert_eq!(param(&q.to_params(), "name"), vec!["ilike.*ab\\%*"]);

        let q = Query::table("players").filter(Filter::Contains("name".into(), "a_b".into()));
        assert_eq!(param(&q.to_params(), "name"), vec!["ilike.*a\\_b*"]);
    }

    #[test]
    fn test_or_group_quotes_reserved_operands() {
        let q = Query::table("games").or(vec![
            Filter::Eq("home_team".into(), "Miami (OH)".into()),
            Filter::Eq("away_team".into(), "Miami (OH)".into()),
        ]);
        assert_eq!(
            param(&q.to_params(), "or"),
            vec!["(home_team.eq.\"Miami (OH)\",away_team.eq.\"Miami (OH)\")"]
        );

        let q = Query::table("players").or(vec![
            Filter::Contains("name".into(), "Smith, J".into()),
            Filter::Contains("team".into(), "Smith, J".into()),
        ]);
        assert_eq!(
            param(&q.to_params(), "or"),
            vec!["(name.ilike.\"*Smith, J*\",team.ilike.\"*Smith, J*\")"]
        );
    }

    #[test]
    fn test_top_level_operands_stay_unquoted() {
        let q = Query::table("games").eq("home_team", "Miami (OH)").eq("week", 3);
        let params = q.to_params();
        assert_eq!(param(&params, "home_team"), vec!["eq.Miami (OH)"]);
        assert_eq!(param(&params, "week"), vec!["eq.3"]);
    }

    #[test]
    fn test_quoting_escapes_quotes_and_backslashes() {
        assert_eq!(quote_reserved("plain"), "plain");
        assert_eq!(quote_reserved("St. Louis"), "\"St. Louis\"");
        assert_eq!(quote_reserved("a\"b"), "\"a\\\"b\"");
        assert_eq!(quote_reserved("a\\_b"), "\"a\\\\_b\"");
    }
}
