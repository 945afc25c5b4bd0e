//! Chained `where / order_by / limit` selects compiled into parameterised
//! SQLite queries.
//!
//! Table and column names are `&'static str` identifiers owned by the
//! calling code; every value goes through a bind parameter.

use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{FromRow, QueryBuilder, SqlitePool};

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Real(f64),
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::Text(v.clone())
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
enum Condition {
    Compare {
        column: &'static str,
        op: &'static str,
        value: SqlValue,
    },
    In {
        column: &'static str,
        values: Vec<SqlValue>,
    },
    NotNull(&'static str),
}

#[derive(Debug, Clone)]
pub struct Select {
    table: &'static str,
    columns: Vec<(&'static str, Option<&'static str>)>,
    conditions: Vec<Condition>,
    order: Vec<(&'static str, Direction)>,
    limit: Option<i64>,
}

impl Select {
    pub fn from(table: &'static str) -> Self {
        Self {
            table,
            columns: Vec::new(),
            conditions: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn columns(mut self, columns: &[&'static str]) -> Self {
        self.columns.extend(columns.iter().map(|c| (*c, None)));
        self
    }

    pub fn column_as(mut self, column: &'static str, alias: &'static str) -> Self {
        self.columns.push((column, Some(alias)));
        self
    }

    fn compare(mut self, column: &'static str, op: &'static str, value: SqlValue) -> Self {
        self.conditions.push(Condition::Compare { column, op, value });
        self
    }

    pub fn where_eq(self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.compare(column, "=", value.into())
    }

    pub fn where_gte(self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.compare(column, ">=", value.into())
    }

    pub fn where_lte(self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.compare(column, "<=", value.into())
    }

    pub fn where_in<I, V>(mut self, column: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.conditions.push(Condition::In {
            column,
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn where_not_null(mut self, column: &'static str) -> Self {
        self.conditions.push(Condition::NotNull(column));
        self
    }

    /// `None` leaves the query unfiltered, which keeps optional bounds
    /// (such as an "all time" period) in a single chain.
    pub fn where_gte_opt(self, column: &'static str, value: Option<impl Into<SqlValue>>) -> Self {
        match value {
            Some(v) => self.where_gte(column, v),
            None => self,
        }
    }

    pub fn order_by(mut self, column: &'static str, direction: Direction) -> Self {
        self.order.push((column, direction));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    fn build(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT ");

        if self.columns.is_empty() {
            qb.push("*");
        } else {
            for (i, (column, alias)) in self.columns.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                qb.push(*column);
                if let Some(alias) = alias {
                    qb.push(" AS ").push(*alias);
                }
            }
        }

        qb.push(" FROM ").push(self.table);

        for (i, condition) in self.conditions.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            match condition {
                Condition::Compare { column, op, value } => {
                    qb.push(*column).push(" ").push(*op).push(" ");
                    push_value(&mut qb, value);
                }
                Condition::In { values, .. } if values.is_empty() => {
                    // Nothing can match an empty set.
                    qb.push("0 = 1");
                }
                Condition::In { column, values } => {
                    qb.push(*column).push(" IN (");
                    for (j, value) in values.iter().enumerate() {
                        if j > 0 {
                            qb.push(", ");
                        }
                        push_value(&mut qb, value);
                    }
                    qb.push(")");
                }
                Condition::NotNull(column) => {
                    qb.push(*column).push(" IS NOT NULL");
                }
            }
        }

        for (i, (column, direction)) in self.order.iter().enumerate() {
            qb.push(if i == 0 { " ORDER BY " } else { ", " });
            qb.push(*column).push(" ").push(direction.as_sql());
        }

        if let Some(limit) = self.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        qb
    }

    pub fn to_sql(&self) -> String {
        self.build().sql().to_string()
    }

    pub async fn fetch_all<T>(&self, pool: &SqlitePool) -> Result<Vec<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let mut qb = self.build();
        qb.build_query_as::<T>().fetch_all(pool).await
    }

    pub async fn fetch_optional<T>(&self, pool: &SqlitePool) -> Result<Option<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let mut qb = self.build();
        qb.build_query_as::<T>().fetch_optional(pool).await
    }
}

fn push_value(qb: &mut QueryBuilder<'static, Sqlite>, value: &SqlValue) {
    match value {
        SqlValue::Text(v) => qb.push_bind(v.clone()),
        SqlValue::Integer(v) => qb.push_bind(*v),
        SqlValue::Real(v) => qb.push_bind(*v),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_sql() {
        let select = Select::from("body_stats")
            .columns(&["record_date"])
            .column_as("waist", "value")
            .where_eq("user_id", "u-1")
            .where_gte("record_date", "2026-09-15")
            .where_not_null("waist")
            .order_by("record_date", Direction::Asc);

        assert_eq!(
            select.to_sql(),
            "SELECT record_date, waist AS value FROM body_stats \
             WHERE user_id = ? AND record_date >= ? AND waist IS NOT NULL \
             ORDER BY record_date ASC"
        );
    }

    #[test]
    fn test_select_in_and_limit() {
        let select = Select::from("health_samples")
            .columns(&["id"])
            .where_eq("permission", "Weight")
            .where_in("id", ["a", "b", "c"])
            .order_by("time", Direction::Desc)
            .limit(1);
        assert_eq!(
            select.to_sql(),
            "SELECT id FROM health_samples WHERE permission = ? AND id IN (?, ?, ?) \
             ORDER BY time DESC LIMIT ?"
        );

        let empty = Select::from("health_samples").where_in("id", Vec::<String>::new());
        assert_eq!(empty.to_sql(), "SELECT * FROM health_samples WHERE 0 = 1");
    }

    #[test]
    fn test_optional_bound_is_skipped() {
        let select = Select::from("health_samples").where_gte_opt("time", None::<i64>);
        assert_eq!(select.to_sql(), "SELECT * FROM health_samples");
    }

    #[tokio::test]
    async fn test_fetch_typed_rows() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE t (name TEXT NOT NULL, score REAL)")
            .execute(&pool)
            .await
            .unwrap();
        for (name, score) in [("a", Some(1.5)), ("b", None), ("c", Some(3.0))] {
            sqlx::query("INSERT INTO t (name, score) VALUES (?, ?)")
                .bind(name)
                .bind(score)
                .execute(&pool)
                .await
                .unwrap();
        }

        let rows: Vec<(String, f64)> = Select::from("t")
            .columns(&["name", "score"])
            .where_not_null("score")
            .order_by("score", Direction::Desc)
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(rows, vec![("c".to_string(), 3.0), ("a".to_string(), 1.5)]);

        let top: Option<(String,)> = Select::from("t")
            .columns(&["name"])
            .where_gte("score", 2.0)
            .limit(1)
            .fetch_optional(&pool)
            .await
            .unwrap();
        assert_eq!(top, Some(("c".to_string(),)));
    }
}
