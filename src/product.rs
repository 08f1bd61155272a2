//! Product records, listing drafts and search filters
use super::error::{MarketError, ValidationError};
use super::impact::EcoImpact;
use super::time::TimeStamp;
use chrono::Utc;

pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 2000;

#[derive(minicbor::Encode, minicbor::Decode, Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Category {
    #[n(0)]
    Electronics,
    #[n(1)]
    Clothing,
    #[n(2)]
    Fashion,
    #[n(3)]
    Furniture,
    #[n(4)]
    Books,
    #[n(5)]
    Sports,
    #[n(6)]
    HomeGarden,
    #[n(7)]
    Toys,
    #[n(8)]
    Other,
}

#[derive(minicbor::Encode, minicbor::Decode, Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Condition {
    #[n(0)]
    New,
    #[n(1)]
    LikeNew,
    #[n(2)]
    Good,
    #[n(3)]
    Fair,
    #[n(4)]
    Poor,
}

#[derive(minicbor::Encode, minicbor::Decode, Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProductStatus {
    #[n(0)]
    Listed,
    #[n(1)]
    Sold,
    #[n(2)]
    Removed,
}

#[derive(minicbor::Encode, minicbor::Decode, Clone, Debug, Eq, PartialEq)]
pub struct Product {
    #[n(0)]
    pub id: String, // uuid7, bech32 encoded with a "prod_" prefix
    #[n(1)]
    pub title: String,
    #[n(2)]
    pub description: String,
    #[n(3)]
    pub price: u64,
    #[n(4)]
    pub original_price: Option<u64>, // what the item cost new, if known
    #[n(5)]
    pub category: Category,
    #[n(6)]
    pub condition: Condition,
    #[n(7)]
    pub location: String,
    #[n(8)]
    pub images: Vec<String>,
    #[n(9)]
    pub seller: String, // owner in the authorization sense
    #[n(10)]
    pub status: ProductStatus,
    #[n(11)]
    pub eco_impact: EcoImpact, // fixed at listing time, later edits never recompute it
    #[n(12)]
    pub views: u64,
    #[n(13)]
    pub likes: u64, // always equal to liked_by.len()
    #[n(14)]
    pub liked_by: Vec<String>, // each user at most once
    #[n(15)]
    pub created_at: TimeStamp<Utc>,
    #[n(16)]
    pub updated_at: TimeStamp<Utc>,
}

impl Product {
    /// Ownership gate consulted before any owner-only mutation
    pub fn ensure_owner(&self, actor: &str, denied: &'static str) -> Result<(), MarketError> {
        if self.seller != actor {
            return Err(MarketError::Forbidden(denied));
        }
        Ok(())
    }
}

/// Builder for a new listing. Nothing is persisted until the draft passes
/// [`ProductDraft::validate`], so a rejected draft leaves no partial record.
#[derive(Debug, Default)]
pub struct ProductDraft {
    title: Option<String>,
    description: Option<String>,
    price: Option<u64>,
    original_price: Option<u64>,
    category: Option<Category>,
    condition: Option<Condition>,
    location: Option<String>,
    images: Vec<String>,
}

impl ProductDraft {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_title(mut self, title: &str) -> Self {
        self.title = Some(title.trim().to_owned());
        self
    }
    pub fn set_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }
    pub fn set_price(mut self, price: u64) -> Self {
        self.price = Some(price);
        self
    }
    pub fn set_original_price(mut self, price: u64) -> Self {
        self.original_price = Some(price);
        self
    }
    pub fn set_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }
    pub fn set_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
    pub fn set_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_owned());
        self
    }
    pub fn set_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    /// Checks every required field and returns the fully populated draft
    pub fn validate(self) -> Result<ValidDraft, ValidationError> {
        let Some(title) = self.title else {
            return Err(ValidationError::MissingTitle);
        };
        check_title(&title)?;

        let Some(description) = self.description else {
            return Err(ValidationError::MissingDescription);
        };
        check_description(&description)?;

        let Some(price) = self.price else {
            return Err(ValidationError::MissingPrice);
        };
        check_price(price)?;

        let Some(category) = self.category else {
            return Err(ValidationError::MissingCategory);
        };
        let Some(condition) = self.condition else {
            return Err(ValidationError::MissingCondition);
        };

        let Some(location) = self.location else {
            return Err(ValidationError::MissingLocation);
        };
        check_location(&location)?;

        Ok(ValidDraft {
            title,
            description,
            price,
            original_price: self.original_price,
            category,
            condition,
            location,
            images: self.images,
        })
    }
}

/// A draft that passed validation. Every field is present and within limits.
#[derive(Debug)]
pub struct ValidDraft {
    pub title: String,
    pub description: String,
    pub price: u64,
    pub original_price: Option<u64>,
    pub category: Category,
    pub condition: Condition,
    pub location: String,
    pub images: Vec<String>,
}

/// Owner edit to an existing listing. Fields left unset keep their stored
/// value. Status and eco impact are deliberately absent, status only moves
/// through withdrawal or settlement.
#[derive(Debug, Default)]
pub struct ProductPatch {
    title: Option<String>,
    description: Option<String>,
    price: Option<u64>,
    original_price: Option<u64>,
    category: Option<Category>,
    condition: Option<Condition>,
    location: Option<String>,
    images: Option<Vec<String>>,
}

impl ProductPatch {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_title(mut self, title: &str) -> Self {
        self.title = Some(title.trim().to_owned());
        self
    }
    pub fn set_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }
    pub fn set_price(mut self, price: u64) -> Self {
        self.price = Some(price);
        self
    }
    pub fn set_original_price(mut self, price: u64) -> Self {
        self.original_price = Some(price);
        self
    }
    pub fn set_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }
    pub fn set_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
    pub fn set_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_owned());
        self
    }
    pub fn set_images(mut self, images: Vec<String>) -> Self {
        self.images = Some(images);
        self
    }

    /// Apply the patch, then re-validate the whole record so a bad edit
    /// never reaches the store
    pub fn apply(&self, product: &mut Product) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            product.title = title.clone();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(original_price) = self.original_price {
            product.original_price = Some(original_price);
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(condition) = self.condition {
            product.condition = condition;
        }
        if let Some(location) = &self.location {
            product.location = location.clone();
        }
        if let Some(images) = &self.images {
            product.images = images.clone();
        }

        check_title(&product.title)?;
        check_description(&product.description)?;
        check_price(product.price)?;
        check_location(&product.location)?;

        Ok(())
    }
}

fn check_title(title: &str) -> Result<(), ValidationError> {
    if title.is_empty() {
        return Err(ValidationError::MissingTitle);
    }
    if title.chars().count() > TITLE_MAX {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(())
}

fn check_description(description: &str) -> Result<(), ValidationError> {
    if description.is_empty() {
        return Err(ValidationError::MissingDescription);
    }
    if description.chars().count() > DESCRIPTION_MAX {
        return Err(ValidationError::DescriptionTooLong);
    }
    Ok(())
}

fn check_price(price: u64) -> Result<(), ValidationError> {
    if price == 0 {
        return Err(ValidationError::InvalidPrice);
    }
    Ok(())
}

fn check_location(location: &str) -> Result<(), ValidationError> {
    if location.is_empty() {
        return Err(ValidationError::MissingLocation);
    }
    Ok(())
}

/// Composable search over listed products. Every supplied filter must hold,
/// free text matches the title or the description.
#[derive(Debug, Default)]
pub struct SearchFilter {
    category: Option<Category>,
    condition: Option<Condition>,
    min_price: Option<u64>,
    max_price: Option<u64>,
    text: Option<String>, // held lowercased
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }
    pub fn set_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
    pub fn set_min_price(mut self, min: u64) -> Self {
        self.min_price = Some(min);
        self
    }
    pub fn set_max_price(mut self, max: u64) -> Self {
        self.max_price = Some(max);
        self
    }
    pub fn set_text(mut self, needle: &str) -> Self {
        self.text = Some(needle.to_lowercase());
        self
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = self.category {
            if product.category != category {
                return false;
            }
        }
        if let Some(condition) = self.condition {
            if product.condition != condition {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if product.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if product.price > max {
                return false;
            }
        }
        if let Some(needle) = &self.text {
            let in_title = product.title.to_lowercase().contains(needle);
            let in_description = product.description.to_lowercase().contains(needle);
            if !in_title && !in_description {
                return false;
            }
        }
        true
    }
}
