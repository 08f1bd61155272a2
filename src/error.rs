#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please add a title")]
    MissingTitle,
    #[error("Title cannot be more than 100 characters")]
    TitleTooLong,
    #[error("Please add a description")]
    MissingDescription,
    #[error("Description cannot be more than 2000 characters")]
    DescriptionTooLong,
    #[error("Please add a price")]
    MissingPrice,
    #[error("Price must be greater than zero")]
    InvalidPrice,
    #[error("Please select a category")]
    MissingCategory,
    #[error("Please select condition")]
    MissingCondition,
    #[error("Please add a location")]
    MissingLocation,
    #[error("Please add a delivery address")]
    MissingDeliveryAddress,
    #[error("Please add a name")]
    MissingName,
    #[error("Please add a valid email")]
    InvalidEmail,
}

#[derive(thiserror::Error, Debug)]
pub enum MarketError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("failed to encode record: {0}")]
    Encode(#[from] minicbor::encode::Error<std::convert::Infallible>),
    #[error("failed to decode record: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl MarketError {
    /// True for the error kinds caused by the caller rather than the store
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            MarketError::Validation(_)
                | MarketError::NotFound(_)
                | MarketError::Forbidden(_)
                | MarketError::Conflict(_)
        )
    }
}
