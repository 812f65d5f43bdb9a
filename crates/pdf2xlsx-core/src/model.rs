use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One extracted row of supplier data.
///
/// Parsers fill in whatever the source document carries; everything else
/// stays `None` and is written to the template as a blank cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_number: Option<String>,
    pub product_name: Option<String>,
    pub customs_code: Option<String>,
    /// Weight in grams.
    pub weight_g: Option<Decimal>,
    pub delivered_qty: Option<Decimal>,
    pub net_unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
}

/// A borrowed view of a single LineItem attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(Decimal),
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl LineItem {
    /// Returns the value of `field`, or `None` if the parser left it empty.
    pub fn value(&self, field: Field) -> Option<FieldValue<'_>> {
        match field {
            Field::ProductNumber => self.product_number.as_deref().map(FieldValue::Text),
            Field::ProductName => self.product_name.as_deref().map(FieldValue::Text),
            Field::CustomsCode => self.customs_code.as_deref().map(FieldValue::Text),
            Field::WeightG => self.weight_g.map(FieldValue::Number),
            Field::DeliveredQty => self.delivered_qty.map(FieldValue::Number),
            Field::NetUnitPrice => self.net_unit_price.map(FieldValue::Number),
            Field::TotalPrice => self.total_price.map(FieldValue::Number),
        }
    }

    /// Checks `total_price` against `net_unit_price * delivered_qty`.
    ///
    /// Returns `None` when any of the three values is missing.
    pub fn total_within(&self, tolerance: Decimal) -> Option<bool> {
        let expected = self.net_unit_price? * self.delivered_qty?;
        let total = self.total_price?;
        Some((total - expected).abs() <= tolerance)
    }
}

/// The closed set of LineItem attributes a profile may map a column to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ProductNumber,
    ProductName,
    CustomsCode,
    WeightG,
    DeliveredQty,
    NetUnitPrice,
    TotalPrice,
}

impl Field {
    /// Canonical attribute order, also used for the default profile.
    pub const ALL: [Field; 7] = [
        Field::ProductNumber,
        Field::ProductName,
        Field::CustomsCode,
        Field::WeightG,
        Field::DeliveredQty,
        Field::NetUnitPrice,
        Field::TotalPrice,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::ProductNumber => "product_number",
            Field::ProductName => "product_name",
            Field::CustomsCode => "customs_code",
            Field::WeightG => "weight_g",
            Field::DeliveredQty => "delivered_qty",
            Field::NetUnitPrice => "net_unit_price",
            Field::TotalPrice => "total_price",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Field::WeightG | Field::DeliveredQty | Field::NetUnitPrice | Field::TotalPrice
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField(pub String);

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let known: Vec<&str> = Field::ALL.iter().map(|f| f.name()).collect();
        write!(
            f,
            "unknown line item attribute '{}' (expected one of: {})",
            self.0,
            known.join(", ")
        )
    }
}

impl std::error::Error for UnknownField {}

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}
