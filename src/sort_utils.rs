/// Sort direction for table columns.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Desc,
    Asc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "asc" => Self::Asc,
            _ => Self::Desc,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Trait for column enums. Each sortable table defines its own column enum
/// implementing this trait.
pub trait SortableColumn: Sized + Default + Clone + PartialEq {
    /// Parse column name from query string parameter.
    fn from_str(s: &str) -> Option<Self>;

    /// Convert column to query string parameter value.
    fn as_str(&self) -> &'static str;

    /// SQL expression for ORDER BY clause (e.g., "p.purchase_date").
    fn sql_expression(&self) -> &'static str;
}

/// Trait for filter params that support sorting.
pub trait Sortable {
    fn sort_by(&self) -> Option<&String>;
    fn sort_dir(&self) -> Option<&String>;

    /// Resolve sort parameters into a TableSort config.
    fn resolve_sort<C: SortableColumn>(&self) -> TableSort<C> {
        let column = self
            .sort_by()
            .and_then(|s| C::from_str(s))
            .unwrap_or_default();

        let direction = self
            .sort_dir()
            .map(|s| SortDirection::from_str(s))
            .unwrap_or_default();

        TableSort { column, direction }
    }
}

/// Sort configuration passed to templates.
#[derive(Debug, Clone)]
pub struct TableSort<C: SortableColumn> {
    pub column: C,
    pub direction: SortDirection,
}

impl<C: SortableColumn> TableSort<C> {
    /// Generate SQL ORDER BY expression (e.g., "p.purchase_date DESC").
    pub fn sql_order_by(&self) -> String {
        format!("{} {}", self.column.sql_expression(), self.direction.sql())
    }

    /// Check if this column is currently being sorted.
    pub fn is_active(&self, col: &C) -> bool {
        &self.column == col
    }

    /// Get the direction to use when clicking a column header.
    /// If already sorted by this column, toggle direction; otherwise use default (Desc).
    pub fn next_direction_for(&self, col: &C) -> SortDirection {
        if self.is_active(col) {
            self.direction.toggle()
        } else {
            SortDirection::Desc
        }
    }

    // String-based methods for easier use in templates

    /// Get sort indicator for a column by name ("▲", "▼", or "").
    pub fn indicator_str(&self, col_name: &str) -> &'static str {
        match C::from_str(col_name) {
            Some(col) if self.is_active(&col) => match self.direction {
                SortDirection::Asc => "▲",
                SortDirection::Desc => "▼",
            },
            _ => "",
        }
    }

    /// Generate query string for sorting by column name.
    pub fn query_string_for_str(&self, col_name: &str) -> String {
        match C::from_str(col_name) {
            Some(col) => {
                let dir = self.next_direction_for(&col);
                format!("sort={}&dir={}", col.as_str(), dir.as_str())
            }
            None => String::new(),
        }
    }
}

impl<C: SortableColumn> Default for TableSort<C> {
    fn default() -> Self {
        Self {
            column: C::default(),
            direction: SortDirection::default(),
        }
    }
}
