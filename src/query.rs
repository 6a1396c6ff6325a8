use crate::value::Value;

/// Positional parameter bindings for `?` placeholders.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Params {
    pub values: Vec<Value>,
}

impl Params {
    /// Create a new Params object
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value bound to the next placeholder
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.values.push(value.into());
    }

    pub fn extend(&mut self, other: Params) {
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Self { values }
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Self::new()
    }
}

impl From<Value> for Params {
    fn from(value: Value) -> Self {
        Self {
            values: vec![value],
        }
    }
}

/// Builds [`Params`] from a list of values convertible into [`Value`].
///
/// ```
/// let params = sqlite_rows::params![5, "alice", None::<i64>];
/// assert_eq!(params.len(), 3);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::Params::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Params::from(vec![$($crate::Value::from($value)),+])
    };
}

/// SQL statement with positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub statement: String,
    pub params: Params,
}

impl SqlQuery {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            params: Params::new(),
        }
    }

    pub fn with_params(mut self, params: impl Into<Params>) -> Self {
        self.params = params.into();
        self
    }
}

/// Query operators for building typed filter conditions
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperator {
    Equal(Value),
    NotEqual(Value),
    GreaterThan(Value),
    GreaterThanOrEqual(Value),
    LessThan(Value),
    LessThanOrEqual(Value),
    Like(String),
    In(Vec<Value>),
    IsNull,
    IsNotNull,
}

impl QueryOperator {
    /// Render as a WHERE fragment on `column`, returning the bound values.
    pub fn render(&self, column: &str) -> (String, Params) {
        let binary = |op: &str, value: &Value| (format!("{column} {op} ?"), Params::from(value.clone()));
        match self {
            QueryOperator::Equal(v) => binary("=", v),
            QueryOperator::NotEqual(v) => binary("<>", v),
            QueryOperator::GreaterThan(v) => binary(">", v),
            QueryOperator::GreaterThanOrEqual(v) => binary(">=", v),
            QueryOperator::LessThan(v) => binary("<", v),
            QueryOperator::LessThanOrEqual(v) => binary("<=", v),
            QueryOperator::Like(pattern) => (
                format!("{column} LIKE ?"),
                Params::from(Value::Text(pattern.clone())),
            ),
            // `IN ()` is a syntax error in SQLite; an empty set matches nothing.
            QueryOperator::In(values) if values.is_empty() => ("0".to_string(), Params::new()),
            QueryOperator::In(values) => {
                let placeholders = vec!["?"; values.len()].join(", ");
                (
                    format!("{column} IN ({placeholders})"),
                    Params::from(values.clone()),
                )
            }
            QueryOperator::IsNull => (format!("{column} IS NULL"), Params::new()),
            QueryOperator::IsNotNull => (format!("{column} IS NOT NULL"), Params::new()),
        }
    }
}

/// Accumulated WHERE fragments. Successive clauses are AND-combined.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Filter {
    clauses: Vec<String>,
    params: Params,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(&mut self, clause: impl Into<String>, params: impl Into<Params>) {
        self.clauses.push(clause.into());
        self.params.extend(params.into());
    }

    pub fn and_condition(&mut self, column: &str, op: &QueryOperator) {
        let (clause, params) = op.render(&quote_identifier(column));
        self.and(clause, params);
    }

    pub fn clear(&mut self) {
        self.clauses.clear();
        self.params = Params::new();
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The combined clause, without the `WHERE` keyword.
    pub fn clause(&self) -> Option<String> {
        match self.clauses.as_slice() {
            [] => None,
            [single] => Some(single.clone()),
            many => Some(
                many.iter()
                    .map(|c| format!("({c})"))
                    .collect::<Vec<_>>()
                    .join(" AND "),
            ),
        }
    }
}

/// Quote a table or column name, doubling any embedded `"`.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render `SELECT * FROM <table> [WHERE ..] [ORDER BY ..]`.
pub fn select_all(table: &str, filter: &Filter, order_by: Option<&str>) -> SqlQuery {
    let mut statement = format!("SELECT * FROM {}", quote_identifier(table));
    if let Some(clause) = filter.clause() {
        statement.push_str(" WHERE ");
        statement.push_str(&clause);
    }
    if let Some(order) = order_by {
        statement.push_str(" ORDER BY ");
        statement.push_str(order);
    }
    SqlQuery::new(statement).with_params(filter.params().clone())
}
