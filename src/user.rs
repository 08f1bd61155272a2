use super::error::ValidationError;
use super::impact::EcoImpact;
use super::time::TimeStamp;
use chrono::Utc;

/// Per-user cumulative counters. Only ever mutated through [`EcoStats::apply`],
/// there is no overwrite path.
#[derive(minicbor::Encode, minicbor::Decode, Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EcoStats {
    #[n(0)]
    pub total_co2_saved: u64,
    #[n(1)]
    pub total_water_saved: u64,
    #[n(2)]
    pub total_items_sold: u64,
    #[n(3)]
    pub total_items_bought: u64,
    #[n(4)]
    pub eco_points: u64,
}

impl EcoStats {
    pub fn apply(&mut self, delta: &StatsDelta) {
        self.total_co2_saved = self.total_co2_saved.saturating_add(delta.co2_saved);
        self.total_water_saved = self.total_water_saved.saturating_add(delta.water_saved);
        self.total_items_sold = self.total_items_sold.saturating_add(delta.items_sold);
        self.total_items_bought = self.total_items_bought.saturating_add(delta.items_bought);
        self.eco_points = self.eco_points.saturating_add(delta.eco_points);
    }
}

/// Non-negative increments to a user's ledger. A field left at zero leaves
/// the matching counter alone, so decrements are unrepresentable.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StatsDelta {
    pub co2_saved: u64,
    pub water_saved: u64,
    pub items_sold: u64,
    pub items_bought: u64,
    pub eco_points: u64,
}

impl StatsDelta {
    pub const PURCHASE_POINTS: u64 = 30;
    pub const SALE_POINTS: u64 = 50;

    /// What a buyer earns from a settlement. The buyer keeps the item out of
    /// landfill, so the environmental savings are credited here.
    pub fn purchase(impact: EcoImpact) -> Self {
        Self {
            co2_saved: impact.co2_saved,
            water_saved: impact.water_saved,
            items_bought: 1,
            eco_points: Self::PURCHASE_POINTS,
            ..Self::default()
        }
    }

    /// What a seller earns from a settlement, points and a sale count only
    pub fn sale() -> Self {
        Self {
            items_sold: 1,
            eco_points: Self::SALE_POINTS,
            ..Self::default()
        }
    }

    /// Combine two deltas into one write, used when buyer and seller coincide
    pub fn merge(self, other: Self) -> Self {
        Self {
            co2_saved: self.co2_saved.saturating_add(other.co2_saved),
            water_saved: self.water_saved.saturating_add(other.water_saved),
            items_sold: self.items_sold.saturating_add(other.items_sold),
            items_bought: self.items_bought.saturating_add(other.items_bought),
            eco_points: self.eco_points.saturating_add(other.eco_points),
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Clone, Debug, Eq, PartialEq)]
pub struct UserProfile {
    #[n(0)]
    pub id: String, // uuid7, bech32 encoded with a "user_" prefix
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub email: String,
    #[n(3)]
    pub bio: String,
    #[n(4)]
    pub location: String,
    #[n(5)]
    pub phone: String,
    #[n(6)]
    pub joined: TimeStamp<Utc>,
    #[n(7)]
    pub eco_stats: EcoStats,
}

/// Partial profile edit. Unset fields keep their stored value, the eco
/// ledger is not reachable from here.
#[derive(Debug, Default)]
pub struct ProfilePatch {
    name: Option<String>,
    email: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    phone: Option<String>,
}

impl ProfilePatch {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }
    pub fn set_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_owned());
        self
    }
    pub fn set_bio(mut self, bio: &str) -> Self {
        self.bio = Some(bio.to_owned());
        self
    }
    pub fn set_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_owned());
        self
    }
    pub fn set_phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.to_owned());
        self
    }

    pub fn apply(&self, user: &mut UserProfile) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(bio) = &self.bio {
            user.bio = bio.clone();
        }
        if let Some(location) = &self.location {
            user.location = location.clone();
        }
        if let Some(phone) = &self.phone {
            user.phone = phone.clone();
        }

        validate_identity(&user.name, &user.email)
    }
}

pub fn validate_identity(name: &str, email: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }
    if email.trim().is_empty() || !email.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}
