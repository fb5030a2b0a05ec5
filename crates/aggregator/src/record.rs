use csv::StringRecord;

/// Positional column layout of a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    TransactionId = 0,
    TransactionDate = 1,
    UserId = 2,
    Country = 3,
    Region = 4,
    ProductId = 5,
    ProductName = 6,
    Category = 7,
    Price = 8,
    Quantity = 9,
    TotalPrice = 10,
    StockQuantity = 11,
    AddedDate = 12,
}

pub const COLUMN_COUNT: usize = 13;

/// Number of leading characters of the transaction date that form a month key.
const MONTH_KEY_CHARS: usize = 7;

/// One ledger row, exactly as read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord(StringRecord);

impl RawRecord {
    /// Wraps a decoded row; `None` if it does not have [`COLUMN_COUNT`] fields.
    pub fn new(fields: StringRecord) -> Option<Self> {
        (fields.len() == COLUMN_COUNT).then_some(Self(fields))
    }

    /// Convenience constructor for in-memory rows.
    pub fn from_fields<I, S>(fields: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut record = StringRecord::new();
        for field in fields {
            record.push_field(field.as_ref());
        }
        Self::new(record)
    }

    pub fn field(&self, column: Column) -> &str {
        self.0.get(column as usize).unwrap_or_default()
    }

    pub fn country(&self) -> &str {
        self.field(Column::Country)
    }

    pub fn region(&self) -> &str {
        self.field(Column::Region)
    }

    pub fn product_name(&self) -> &str {
        self.field(Column::ProductName)
    }

    /// Unit price; zero when the cell does not parse.
    pub fn price(&self) -> f64 {
        parse_f64(self.field(Column::Price))
    }

    /// Quantity; zero when the cell does not parse.
    pub fn quantity(&self) -> i64 {
        parse_i64(self.field(Column::Quantity))
    }

    /// Stock level; zero when the cell does not parse.
    pub fn stock_quantity(&self) -> i64 {
        parse_i64(self.field(Column::StockQuantity))
    }

    /// `price * quantity`, recomputed rather than trusting the total column.
    pub fn revenue(&self) -> f64 {
        self.price() * self.quantity() as f64
    }

    /// First seven characters of the transaction date (`YYYY-MM`).
    ///
    /// Short or malformed dates produce a degenerate key instead of an error.
    pub fn month_key(&self) -> &str {
        let date = self.field(Column::TransactionDate);
        match date.char_indices().nth(MONTH_KEY_CHARS) {
            Some((idx, _)) => &date[..idx],
            None => date,
        }
    }
}

fn parse_f64(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn parse_i64(raw: &str) -> i64 {
    raw.trim().parse::<i64>().unwrap_or(0)
}
