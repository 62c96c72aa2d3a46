use chrono::NaiveDate;

use crate::filters::{Disposition, EffectiveFilter, FilterValue};
use crate::queries::QueryDefinition;

/// A bind parameter for a compiled query
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    TextList(Vec<String>),
    Date(NaiveDate),
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

/// Compiles an effective filter into a parameterized WHERE clause
///
/// Column names come from the closed `Dimension` enum and the query
/// definition, never from caller input; caller values only travel as binds.
pub struct FilterWhere {
    conditions: Vec<String>,
    params: Vec<SqlParam>,
}

impl FilterWhere {
    pub fn generate(filter: &EffectiveFilter, date_column: &str) -> (String, Vec<SqlParam>) {
        let mut filter_where = Self {
            conditions: vec![],
            params: vec![],
        };
        filter_where.build(filter, date_column);

        let where_clause = if filter_where.conditions.is_empty() {
            "1=1".to_string()
        } else {
            filter_where.conditions.join(" AND ")
        };
        (where_clause, filter_where.params)
    }

    fn build(&mut self, filter: &EffectiveFilter, date_column: &str) {
        if let Some(start) = filter.start_date() {
            let p = self.push(SqlParam::Date(start));
            self.conditions.push(format!("\"{}\" >= {}", date_column, p));
        }
        if let Some(end) = filter.end_date() {
            let p = self.push(SqlParam::Date(end));
            self.conditions.push(format!("\"{}\" <= {}", date_column, p));
        }

        match filter.disposition() {
            Disposition::All => {}
            Disposition::Open => self.conditions.push("\"is_open\" = TRUE".to_string()),
            Disposition::Lost => self.conditions.push("\"is_lost\" = TRUE".to_string()),
            Disposition::Converted => self.conditions.push("\"is_joined\" = TRUE".to_string()),
        }

        for (dimension, value) in filter.dimensions() {
            let column = dimension.column();
            let condition = match value {
                FilterValue::One(v) => {
                    let p = self.push(SqlParam::Text(v.clone()));
                    format!("\"{}\" = {}", column, p)
                }
                FilterValue::Any(set) if set.is_empty() => "1=0".to_string(),
                FilterValue::Any(set) => {
                    let p = self.push(SqlParam::TextList(set.iter().cloned().collect()));
                    format!("\"{}\" = ANY({})", column, p)
                }
            };
            self.conditions.push(condition);
        }
    }

    fn push(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }
}

/// Full statement for a catalog query, wrapped to return rows as one JSON array
pub fn compile(query: &QueryDefinition, filter: &EffectiveFilter) -> SqlResult {
    let (where_clause, params) = FilterWhere::generate(filter, query.date_column);
    let inner = query.sql.replace("{where}", &where_clause);
    SqlResult {
        query: format!("SELECT COALESCE(json_agg(t), '[]'::json) AS rows FROM ({}) t", inner),
        params,
    }
}
