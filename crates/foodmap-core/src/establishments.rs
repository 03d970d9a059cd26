//! Establishment records as persisted per postal code.
//!
//! ## Wire format
//!
//! Records are stored as pretty-printed JSON arrays, one file per
//! establishment type. The catalog lives under a type-specific key:
//!
//! - restaurants: `menu_items` / `menu_items_count`
//! - stores: `products` / `products_count`
//!
//! Unknown text values are `None` in memory and the literal string `"N/A"`
//! on disk. Reading accepts `"N/A"`, `""`, `null`, or a missing key as absent.
//! Older restaurant files carry no `establishment_type`; the catalog key
//! decides the type in that case.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Serialized form of an absent text value.
pub const NOT_AVAILABLE: &str = "N/A";

mod not_available {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::NOT_AVAILABLE;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.as_deref().unwrap_or(NOT_AVAILABLE))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.filter(|v| {
            let trimmed = v.trim();
            !trimmed.is_empty() && trimmed != NOT_AVAILABLE
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstablishmentKind {
    Restaurant,
    Store,
}

impl std::fmt::Display for EstablishmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstablishmentKind::Restaurant => write!(f, "restaurant"),
            EstablishmentKind::Store => write!(f, "store"),
        }
    }
}

/// A restaurant menu entry. The title may be absent when only a description
/// could be extracted; such items drive re-categorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MenuItemWire", into = "MenuItemWire")]
pub struct MenuItem {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl MenuItem {
    #[must_use]
    pub fn new(title: Option<String>, description: Option<String>) -> Self {
        Self { title, description }
    }

    #[must_use]
    pub fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    #[must_use]
    pub fn has_description(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }
}

#[derive(Serialize, Deserialize)]
struct MenuItemWire {
    #[serde(default, with = "not_available")]
    title: Option<String>,
    #[serde(default, with = "not_available")]
    description: Option<String>,
    /// Always `"N/A"`; item deep links are not collected.
    #[serde(default, with = "not_available")]
    link: Option<String>,
}

impl From<MenuItemWire> for MenuItem {
    fn from(wire: MenuItemWire) -> Self {
        Self {
            title: wire.title,
            description: wire.description,
        }
    }
}

impl From<MenuItem> for MenuItemWire {
    fn from(item: MenuItem) -> Self {
        Self {
            title: item.title,
            description: item.description,
            link: None,
        }
    }
}

/// A grocery/retail product, described by a single free-text line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreProduct {
    pub description: String,
}

impl StoreProduct {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// One extracted catalog entry, before it is filed into a [`Catalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogItem {
    Menu(MenuItem),
    Product(StoreProduct),
}

impl CatalogItem {
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        match self {
            CatalogItem::Menu(item) => item.title.as_deref(),
            CatalogItem::Product(_) => None,
        }
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            CatalogItem::Menu(item) => item.description.as_deref(),
            CatalogItem::Product(product) => Some(product.description.as_str()),
        }
    }
}

/// The items of one establishment. The variant *is* the establishment type,
/// so a store can never carry menu-shaped items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Catalog {
    Menu(Vec<MenuItem>),
    Products(Vec<StoreProduct>),
}

impl Catalog {
    #[must_use]
    pub fn empty(kind: EstablishmentKind) -> Self {
        match kind {
            EstablishmentKind::Restaurant => Catalog::Menu(Vec::new()),
            EstablishmentKind::Store => Catalog::Products(Vec::new()),
        }
    }

    /// Files extracted items under `kind`, reshaping any item of the other
    /// shape on the way in.
    #[must_use]
    pub fn from_items(kind: EstablishmentKind, items: Vec<CatalogItem>) -> Self {
        match kind {
            EstablishmentKind::Restaurant => Catalog::Menu(
                items
                    .into_iter()
                    .map(|item| match item {
                        CatalogItem::Menu(menu) => menu,
                        CatalogItem::Product(product) => {
                            MenuItem::new(None, Some(product.description))
                        }
                    })
                    .collect(),
            ),
            EstablishmentKind::Store => Catalog::Products(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        CatalogItem::Menu(menu) => menu.description.map(StoreProduct::new),
                        CatalogItem::Product(product) => Some(product),
                    })
                    .collect(),
            ),
        }
    }

    #[must_use]
    pub fn kind(&self) -> EstablishmentKind {
        match self {
            Catalog::Menu(_) => EstablishmentKind::Restaurant,
            Catalog::Products(_) => EstablishmentKind::Store,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Catalog::Menu(items) => items.len(),
            Catalog::Products(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts the catalog to `kind`.
    ///
    /// Menu → products keeps descriptions, drops titles, and drops items that
    /// have no description. Products → menu keeps each description with no title.
    #[must_use]
    pub fn reshape(self, kind: EstablishmentKind) -> Self {
        match (self, kind) {
            (Catalog::Menu(items), EstablishmentKind::Store) => Catalog::Products(
                items
                    .into_iter()
                    .filter(MenuItem::has_description)
                    .filter_map(|item| item.description.map(StoreProduct::new))
                    .collect(),
            ),
            (Catalog::Products(items), EstablishmentKind::Restaurant) => Catalog::Menu(
                items
                    .into_iter()
                    .map(|p| MenuItem::new(None, Some(p.description)))
                    .collect(),
            ),
            (same, _) => same,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub registration_number: Option<String>,
}

impl ContactInfo {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.email.is_some() && self.phone.is_some() && self.registration_number.is_some()
    }
}

/// A single restaurant or store scraped for a postal code. `url` is the
/// identity key across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RecordWire", try_from = "RecordWire")]
pub struct EstablishmentRecord {
    pub url: String,
    pub postal_code: String,
    pub name: Option<String>,
    pub contact: ContactInfo,
    pub catalog: Catalog,
}

impl EstablishmentRecord {
    #[must_use]
    pub fn new(url: impl Into<String>, postal_code: impl Into<String>, catalog: Catalog) -> Self {
        Self {
            url: url.into(),
            postal_code: postal_code.into(),
            name: None,
            contact: ContactInfo::default(),
            catalog,
        }
    }

    #[must_use]
    pub fn kind(&self) -> EstablishmentKind {
        self.catalog.kind()
    }

    #[must_use]
    pub fn items_count(&self) -> usize {
        self.catalog.len()
    }

    /// Changes the establishment type, reshaping its items in the same step.
    pub fn reclassify(&mut self, kind: EstablishmentKind) {
        let catalog = std::mem::replace(&mut self.catalog, Catalog::Menu(Vec::new()));
        self.catalog = catalog.reshape(kind);
    }
}

#[derive(Serialize, Deserialize)]
struct RecordWire {
    url: String,
    #[serde(default)]
    postal_code: String,
    #[serde(default, with = "not_available")]
    name: Option<String>,
    #[serde(default)]
    establishment_type: Option<EstablishmentKind>,
    #[serde(default, with = "not_available")]
    email: Option<String>,
    #[serde(default, with = "not_available")]
    phone: Option<String>,
    #[serde(default, with = "not_available")]
    registration_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    menu_items: Option<Vec<MenuItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    menu_items_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    products: Option<Vec<StoreProduct>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    products_count: Option<usize>,
}

impl From<EstablishmentRecord> for RecordWire {
    fn from(record: EstablishmentRecord) -> Self {
        let kind = record.kind();
        let (menu_items, menu_items_count, products, products_count) = match record.catalog {
            Catalog::Menu(items) => {
                let count = items.len();
                (Some(items), Some(count), None, None)
            }
            Catalog::Products(items) => {
                let count = items.len();
                (None, None, Some(items), Some(count))
            }
        };

        Self {
            url: record.url,
            postal_code: record.postal_code,
            name: record.name,
            establishment_type: Some(kind),
            email: record.contact.email,
            phone: record.contact.phone,
            registration_number: record.contact.registration_number,
            menu_items,
            menu_items_count,
            products,
            products_count,
        }
    }
}

impl TryFrom<RecordWire> for EstablishmentRecord {
    type Error = CoreError;

    fn try_from(wire: RecordWire) -> Result<Self, Self::Error> {
        let mismatch = |url: &str, reason: &str| CoreError::InvalidRecord {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let catalog = match (wire.establishment_type, wire.menu_items, wire.products) {
            (_, Some(_), Some(_)) => {
                return Err(mismatch(
                    &wire.url,
                    "record has both menu_items and products",
                ));
            }
            (Some(EstablishmentKind::Restaurant), None, Some(_)) => {
                return Err(mismatch(&wire.url, "restaurant record carries products"));
            }
            (Some(EstablishmentKind::Store), Some(_), None) => {
                return Err(mismatch(&wire.url, "store record carries menu_items"));
            }
            (_, None, Some(products)) => Catalog::Products(products),
            (_, Some(items), None) => Catalog::Menu(items),
            (kind, None, None) => Catalog::empty(kind.unwrap_or(EstablishmentKind::Restaurant)),
        };

        Ok(Self {
            url: wire.url,
            postal_code: wire.postal_code,
            name: wire.name,
            contact: ContactInfo {
                email: wire.email,
                phone: wire.phone,
                registration_number: wire.registration_number,
            },
            catalog,
        })
    }
}

#[cfg(test)]
#[path = "establishments_test.rs"]
mod tests;
