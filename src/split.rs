//! Split planning for rdbc-bridge
//!
//! Partitions an import query into independently scannable sub-queries. The
//! import query carries a literal placeholder token; the planner runs a
//! bounding query for the split column's [min, max], divides the interval
//! into contiguous half-open ranges, and substitutes each worker's range
//! predicate for the token. With one split the token (and its enclosing
//! boolean connective) is stripped instead.

use crate::connection::Connection;
use crate::dialect::DialectDescriptor;
use crate::error::{Error, Result};
use crate::types::Value;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;

/// Literal marker in the import query that each split replaces with its own
/// range predicate.
pub const CONDITIONS_TOKEN: &str = "$CONDITIONS";

/// Upper bound on the requested split count. Keeps the boundary arithmetic
/// in range even over a full-width integer key domain.
pub const MAX_NUM_SPLITS: usize = 10_000;

/// One worker's partition of the import query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    /// Zero-based split index
    pub index: usize,
    /// The fully substituted query this worker runs
    pub query: String,
    /// The range predicate substituted into the query, if any
    pub predicate: Option<String>,
}

/// Plans the partitioning of an import query.
#[derive(Debug, Clone)]
pub struct SplitPlanner {
    import_query: String,
    bounding_query: String,
    split_column: Option<String>,
    num_splits: usize,
    dialect: DialectDescriptor,
}

impl SplitPlanner {
    /// Create a planner for an import query
    pub fn new(import_query: impl Into<String>, dialect: DialectDescriptor) -> Self {
        Self {
            import_query: import_query.into(),
            bounding_query: String::new(),
            split_column: None,
            num_splits: 1,
            dialect,
        }
    }

    /// Set the bounding query returning one row of [min, max] over the split column
    pub fn with_bounding_query(mut self, sql: impl Into<String>) -> Self {
        self.bounding_query = sql.into();
        self
    }

    /// Set the split column
    pub fn with_split_column(mut self, column: impl Into<String>) -> Self {
        self.split_column = Some(column.into());
        self
    }

    /// Set the requested number of splits (minimum 1)
    pub fn with_num_splits(mut self, n: usize) -> Self {
        self.num_splits = n.max(1);
        self
    }

    /// Validate the configuration without touching the database.
    ///
    /// Runs at configure time so a bad job fails before any connection opens.
    pub fn validate(&self) -> Result<()> {
        if self.num_splits > MAX_NUM_SPLITS {
            return Err(Error::config(
                "num-splits",
                format!("split count exceeds the maximum of {MAX_NUM_SPLITS}"),
            ));
        }
        if self.num_splits > 1 {
            if !self.import_query.contains(CONDITIONS_TOKEN) {
                return Err(Error::config(
                    "import-query",
                    format!(
                        "parallel import requires the {CONDITIONS_TOKEN} placeholder in the query"
                    ),
                ));
            }
            if self.split_column.as_deref().unwrap_or("").is_empty() {
                return Err(Error::config(
                    "split-by",
                    "parallel import requires a split column",
                ));
            }
            if self.bounding_query.is_empty() {
                return Err(Error::config(
                    "bounding-query",
                    "parallel import requires a bounding query",
                ));
            }
        }
        Ok(())
    }

    /// The single-worker form of the import query: the placeholder and its
    /// enclosing boolean connective removed, whitespace-insensitively.
    pub fn single_query(&self) -> Result<String> {
        strip_conditions(&self.import_query)
    }

    /// Plan the splits, running the bounding query on `conn` when more than
    /// one split is requested.
    pub async fn plan(&self, conn: &dyn Connection) -> Result<Vec<Split>> {
        self.validate()?;

        if self.num_splits == 1 {
            return Ok(vec![Split {
                index: 0,
                query: self.single_query()?,
                predicate: None,
            }]);
        }

        let column = self
            .split_column
            .as_deref()
            .ok_or_else(|| Error::config("split-by", "parallel import requires a split column"))?;

        let rows = conn
            .query(&self.bounding_query, &[])
            .await
            .map_err(|e| {
                Error::query_with_sql(
                    format!("bounding query failed: {e}"),
                    self.bounding_query.as_str(),
                )
            })?;
        let row = match rows.first() {
            Some(row) if row.len() >= 2 => row,
            _ => {
                return Err(Error::split(
                    column,
                    "bounding query must return one row of [min, max]",
                ))
            }
        };
        let min = &row.values()[0];
        let max = &row.values()[1];

        // Empty table reports NULL bounds; nothing to partition.
        if min.is_null() || max.is_null() {
            tracing::debug!(column, "null split bounds, collapsing to a single split");
            return Ok(vec![Split {
                index: 0,
                query: self.single_query()?,
                predicate: None,
            }]);
        }

        let quoted = self.dialect.quote_identifier(column);
        if min == max {
            let lo = self.dialect.render_literal(min)?;
            let hi = self.dialect.render_literal(max)?;
            let predicate = format!("{quoted} >= {lo} AND {quoted} <= {hi}");
            return Ok(vec![self.substituted(0, predicate)]);
        }

        let points = boundaries(column, min, max, self.num_splits)?;
        let mut splits = Vec::with_capacity(points.len() - 1);
        for (i, pair) in points.windows(2).enumerate() {
            let lo = self.dialect.render_literal(&pair[0])?;
            let hi = self.dialect.render_literal(&pair[1])?;
            // Last range is end-inclusive so the union covers [min, max].
            let cmp = if i == points.len() - 2 { "<=" } else { "<" };
            let predicate = format!("{quoted} >= {lo} AND {quoted} {cmp} {hi}");
            splits.push(self.substituted(i, predicate));
        }
        tracing::debug!(column, splits = splits.len(), "planned import splits");
        Ok(splits)
    }

    fn substituted(&self, index: usize, predicate: String) -> Split {
        Split {
            index,
            query: self.import_query.replace(CONDITIONS_TOKEN, &predicate),
            predicate: Some(predicate),
        }
    }
}

/// Remove the placeholder token and its enclosing connective from a query.
///
/// `WHERE $CONDITIONS AND rest` becomes `WHERE rest`; a trailing
/// `WHERE $CONDITIONS` or `AND $CONDITIONS` disappears entirely. A token in
/// any other position cannot be stripped safely and is a configuration error.
fn strip_conditions(query: &str) -> Result<String> {
    let mut tokens: Vec<&str> = query.split_whitespace().collect();

    loop {
        let Some(pos) = tokens.iter().position(|t| *t == CONDITIONS_TOKEN) else {
            return Ok(tokens.join(" "));
        };
        let prev = pos
            .checked_sub(1)
            .map(|i| tokens[i].to_ascii_uppercase());
        let next = tokens.get(pos + 1).map(|t| t.to_ascii_uppercase());

        match (prev.as_deref(), next.as_deref()) {
            (Some("WHERE"), Some("AND")) => {
                // keep WHERE, drop token and the AND
                tokens.drain(pos..=pos + 1);
            }
            (Some("WHERE"), _) => {
                tokens.drain(pos - 1..=pos);
            }
            (Some("AND"), _) => {
                tokens.drain(pos - 1..=pos);
            }
            _ => {
                return Err(Error::config(
                    "import-query",
                    format!(
                        "cannot remove bare {CONDITIONS_TOKEN} placeholder for a \
                         single-split import; remove it from the query"
                    ),
                ));
            }
        }
    }
}

/// Ordinal representation of an orderable split bound.
enum Ordinal {
    Int(i64),
    Decimal(Decimal),
}

fn to_ordinal(column: &str, value: &Value) -> Result<Ordinal> {
    Ok(match value {
        Value::Int32(n) => Ordinal::Int(i64::from(*n)),
        Value::Int64(n) => Ordinal::Int(*n),
        Value::Decimal(d) => Ordinal::Decimal(*d),
        Value::Date(d) => Ordinal::Int(i64::from(d.num_days_from_ce())),
        Value::DateTime(dt) => Ordinal::Int(dt.and_utc().timestamp_micros()),
        Value::Timestamp(ts) => Ordinal::Int(ts.timestamp_micros()),
        other => {
            return Err(Error::split(
                column,
                format!("cannot partition on a {} column", other.type_name()),
            ))
        }
    })
}

fn from_ordinal(column: &str, template: &Value, ordinal: i64) -> Result<Value> {
    Ok(match template {
        Value::Int32(_) | Value::Int64(_) => Value::Int64(ordinal),
        Value::Date(_) => {
            let ord = i32::try_from(ordinal)
                .ok()
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .ok_or_else(|| Error::split(column, "split boundary out of date range"))?;
            Value::Date(ord)
        }
        Value::DateTime(_) => {
            let dt = DateTime::<Utc>::from_timestamp_micros(ordinal)
                .ok_or_else(|| Error::split(column, "split boundary out of timestamp range"))?;
            Value::DateTime(dt.naive_utc())
        }
        Value::Timestamp(_) => {
            let ts = DateTime::<Utc>::from_timestamp_micros(ordinal)
                .ok_or_else(|| Error::split(column, "split boundary out of timestamp range"))?;
            Value::Timestamp(ts)
        }
        _ => return Err(Error::split(column, "unsupported split boundary type")),
    })
}

/// Compute `n + 1` monotone boundary points from `min` to `max`. Requires
/// `min < max`; capped so no empty range is emitted for narrow integer
/// domains.
fn boundaries(column: &str, min: &Value, max: &Value, n: usize) -> Result<Vec<Value>> {
    match (to_ordinal(column, min)?, to_ordinal(column, max)?) {
        (Ordinal::Int(lo), Ordinal::Int(hi)) => {
            if hi < lo {
                return Err(Error::split(column, "bounding query returned max < min"));
            }
            let span = i128::from(hi) - i128::from(lo);
            let n = i128::try_from(n)
                .map_err(|_| Error::split(column, "split count out of range"))?
                .min(span.max(1));
            let mut points = Vec::with_capacity(n as usize + 1);
            for i in 0..=n {
                let point = i128::from(lo) + span * i / n;
                points.push(from_ordinal(column, min, point as i64)?);
            }
            Ok(points)
        }
        (Ordinal::Decimal(lo), Ordinal::Decimal(hi)) => {
            if hi < lo {
                return Err(Error::split(column, "bounding query returned max < min"));
            }
            let count = Decimal::from(n as u64);
            let step = (hi - lo) / count;
            let mut points = Vec::with_capacity(n + 1);
            for i in 0..n {
                points.push(Value::Decimal(lo + step * Decimal::from(i as u64)));
            }
            // exact upper bound, immune to division rounding
            points.push(Value::Decimal(hi));
            Ok(points)
        }
        _ => Err(Error::split(
            column,
            "bounding query returned mixed-type bounds",
        )),
    }
}
