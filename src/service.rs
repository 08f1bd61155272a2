//! Service layer API for marketplace operations
use super::error::MarketError;
use super::impact::ImpactModel;
use super::product::{Product, ProductDraft, ProductPatch, ProductStatus, SearchFilter};
use super::time::TimeStamp;
use super::transaction::{DeliveryMethod, Transaction, TransactionStatus, TransitionPolicy};
use super::user::{EcoStats, ProfilePatch, StatsDelta, UserProfile, validate_identity};
use super::utils::new_uuid_to_bech32;
use sled::transaction::{
    ConflictableTransactionError, TransactionError, TransactionalTree, abort,
};
use sled::{Transactional, Tree};
use std::sync::Arc;
use tracing::{debug, info};

const PRODUCT_NOT_FOUND: &str = "Product not found";
const TRANSACTION_NOT_FOUND: &str = "Transaction not found";
const USER_NOT_FOUND: &str = "User not found";
const PRODUCT_UNAVAILABLE: &str = "This product is no longer available";
const UPDATE_PRODUCT_DENIED: &str = "Not authorized to update this product";
const DELETE_PRODUCT_DENIED: &str = "Not authorized to delete this product";
const INVALID_TRANSITION: &str = "Status change is not permitted from the current state";

/// Construction-time knobs. Both are fixed for the life of the service.
#[derive(Clone, Debug, Default)]
pub struct MarketConfig {
    pub impact: ImpactModel,
    pub transitions: TransitionPolicy,
}

pub struct MarketService {
    products: Tree,
    transactions: Tree,
    users: Tree,
    config: MarketConfig,
}

impl MarketService {
    pub fn new(instance: Arc<sled::Db>) -> Result<Self, MarketError> {
        Self::with_config(instance, MarketConfig::default())
    }

    pub fn with_config(
        instance: Arc<sled::Db>,
        config: MarketConfig,
    ) -> Result<Self, MarketError> {
        Ok(Self {
            products: instance.open_tree("products")?,
            transactions: instance.open_tree("transactions")?,
            users: instance.open_tree("users")?,
            config,
        })
    }

    /// Create a user record with a zeroed eco ledger
    pub fn register_user(&self, name: &str, email: &str) -> Result<UserProfile, MarketError> {
        validate_identity(name, email)?;

        let user = UserProfile {
            id: new_uuid_to_bech32("user_")?,
            name: name.trim().to_owned(),
            email: email.trim().to_owned(),
            bio: String::new(),
            location: String::new(),
            phone: String::new(),
            joined: TimeStamp::new(),
            eco_stats: EcoStats::default(),
        };
        self.users
            .insert(user.id.as_bytes(), minicbor::to_vec(&user)?)?;

        info!(user = %user.id, "registered user");
        Ok(user)
    }

    /// Fetch a user's profile
    pub fn profile(&self, user_id: &str) -> Result<UserProfile, MarketError> {
        load_record(&self.users, user_id, USER_NOT_FOUND)
    }

    /// Edit profile fields. Runs under compare-and-swap so a settlement
    /// crediting the ledger at the same moment is never lost.
    pub fn update_profile(
        &self,
        user_id: &str,
        patch: ProfilePatch,
    ) -> Result<UserProfile, MarketError> {
        let user = update_record(
            &self.users,
            user_id,
            USER_NOT_FOUND,
            |user: &mut UserProfile| {
                patch.apply(user)?;
                Ok(())
            },
        )?;
        debug!(user = %user.id, "updated profile");
        Ok(user)
    }

    /// Read the eco ledger on its own
    pub fn eco_stats(&self, user_id: &str) -> Result<EcoStats, MarketError> {
        Ok(self.profile(user_id)?.eco_stats)
    }

    /// Apply a ledger delta. All eco stat movement funnels through here or
    /// through settlement, there is no overwrite path.
    pub fn credit(&self, user_id: &str, delta: StatsDelta) -> Result<EcoStats, MarketError> {
        let user = update_record(
            &self.users,
            user_id,
            USER_NOT_FOUND,
            |user: &mut UserProfile| {
                user.eco_stats.apply(&delta);
                Ok(())
            },
        )?;
        debug!(user = %user.id, points = user.eco_stats.eco_points, "credited eco stats");
        Ok(user.eco_stats)
    }

    /// Validate a draft and persist it as a live listing
    pub fn create_listing(
        &self,
        seller_id: &str,
        draft: ProductDraft,
    ) -> Result<Product, MarketError> {
        let draft = draft.validate()?;

        // the estimate is fixed here, later edits never recompute it
        let eco_impact = self.config.impact.estimate(draft.category, draft.price);
        let now = TimeStamp::new();
        let product = Product {
            id: new_uuid_to_bech32("prod_")?,
            title: draft.title,
            description: draft.description,
            price: draft.price,
            original_price: draft.original_price,
            category: draft.category,
            condition: draft.condition,
            location: draft.location,
            images: draft.images,
            seller: seller_id.to_owned(),
            status: ProductStatus::Listed,
            eco_impact,
            views: 0,
            likes: 0,
            liked_by: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.products
            .insert(product.id.as_bytes(), minicbor::to_vec(&product)?)?;

        info!(product = %product.id, seller = %product.seller, "created listing");
        Ok(product)
    }

    /// Plain read with no side effects
    pub fn product(&self, product_id: &str) -> Result<Product, MarketError> {
        load_record(&self.products, product_id, PRODUCT_NOT_FOUND)
    }

    /// Detail read. Bumps the view counter by exactly one even under
    /// concurrent viewers. Views are not edits, so `updated_at` stays put.
    pub fn view_product(&self, product_id: &str) -> Result<Product, MarketError> {
        update_record(
            &self.products,
            product_id,
            PRODUCT_NOT_FOUND,
            |product: &mut Product| {
                product.views = product.views.saturating_add(1);
                Ok(())
            },
        )
    }

    /// Browse live listings. Filter fields compose with AND, results come
    /// back newest first. Sold and removed products never appear.
    pub fn search(&self, filter: &SearchFilter) -> Result<Vec<Product>, MarketError> {
        let mut found: Vec<Product> = scan(&self.products, |product: &Product| {
            product.status == ProductStatus::Listed && filter.matches(product)
        })?;
        found.sort_by(|a, b| {
            b.created_at
                .to_datetime_utc()
                .cmp(&a.created_at.to_datetime_utc())
        });
        Ok(found)
    }

    /// Everything a seller has listed regardless of status, newest first
    pub fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Product>, MarketError> {
        let mut found: Vec<Product> =
            scan(&self.products, |product: &Product| product.seller == owner_id)?;
        found.sort_by(|a, b| {
            b.created_at
                .to_datetime_utc()
                .cmp(&a.created_at.to_datetime_utc())
        });
        Ok(found)
    }

    /// Edit listing fields. The owner gate and the field validation run
    /// inside the swap loop, so every retry rechecks against fresh state.
    pub fn update_listing(
        &self,
        product_id: &str,
        actor: &str,
        patch: ProductPatch,
    ) -> Result<Product, MarketError> {
        let product = update_record(
            &self.products,
            product_id,
            PRODUCT_NOT_FOUND,
            |product: &mut Product| {
                product.ensure_owner(actor, UPDATE_PRODUCT_DENIED)?;
                patch.apply(product)?;
                product.updated_at = TimeStamp::new();
                Ok(())
            },
        )?;
        info!(product = %product.id, "updated listing");
        Ok(product)
    }

    /// Take a live listing off the market without deleting its record
    pub fn withdraw_listing(&self, product_id: &str, actor: &str) -> Result<Product, MarketError> {
        let product = update_record(
            &self.products,
            product_id,
            PRODUCT_NOT_FOUND,
            |product: &mut Product| {
                product.ensure_owner(actor, DELETE_PRODUCT_DENIED)?;
                if product.status != ProductStatus::Listed {
                    return Err(MarketError::Conflict(PRODUCT_UNAVAILABLE));
                }
                product.status = ProductStatus::Removed;
                product.updated_at = TimeStamp::new();
                Ok(())
            },
        )?;
        info!(product = %product.id, "withdrew listing");
        Ok(product)
    }

    /// Drop the record entirely. Unlike withdrawal this works in any status.
    pub fn delete_listing(&self, product_id: &str, actor: &str) -> Result<(), MarketError> {
        loop {
            let Some(old) = self.products.get(product_id.as_bytes())? else {
                return Err(MarketError::NotFound(PRODUCT_NOT_FOUND));
            };
            let product: Product = minicbor::decode(&old)?;
            product.ensure_owner(actor, DELETE_PRODUCT_DENIED)?;

            if self
                .products
                .compare_and_swap(product_id.as_bytes(), Some(&old), None::<&[u8]>)?
                .is_ok()
            {
                info!(product = %product.id, "deleted listing");
                return Ok(());
            }
        }
    }

    /// Flip a user's like on a product. The direction is pinned by the first
    /// read, and a retry that finds the flip already applied returns without
    /// writing, so racing duplicates of the same call settle on one flip.
    pub fn toggle_like(&self, product_id: &str, user_id: &str) -> Result<Product, MarketError> {
        // pin the direction before entering the swap loop
        let first: Product = load_record(&self.products, product_id, PRODUCT_NOT_FOUND)?;
        let liking = !first.liked_by.iter().any(|id| id == user_id);

        loop {
            let Some(old) = self.products.get(product_id.as_bytes())? else {
                return Err(MarketError::NotFound(PRODUCT_NOT_FOUND));
            };
            let mut product: Product = minicbor::decode(&old)?;

            if product.liked_by.iter().any(|id| id == user_id) == liking {
                // intent already applied by a twin of this call
                return Ok(product);
            }
            if liking {
                product.liked_by.push(user_id.to_owned());
            } else {
                product.liked_by.retain(|id| id != user_id);
            }
            product.likes = product.liked_by.len() as u64;
            product.updated_at = TimeStamp::new();

            let new = minicbor::to_vec(&product)?;
            if self
                .products
                .compare_and_swap(product_id.as_bytes(), Some(&old), Some(new))?
                .is_ok()
            {
                debug!(product = %product.id, user = %user_id, liking, "toggled like");
                return Ok(product);
            }
        }
    }

    /// Atomically purchase a live listing.
    ///
    /// One sled transaction spans all three trees: the settlement record is
    /// inserted, the product flips to sold and both ledgers are credited, or
    /// none of that happens. Settling the same product twice leaves exactly
    /// one record and one set of credits, the loser gets a conflict.
    pub fn settle(
        &self,
        product_id: &str,
        buyer_id: &str,
        delivery: DeliveryMethod,
    ) -> Result<Transaction, MarketError> {
        delivery.validate()?;
        // fail before writing anything if the buyer cannot be credited
        if self.users.get(buyer_id.as_bytes())?.is_none() {
            return Err(MarketError::NotFound(USER_NOT_FOUND));
        }

        let transaction_id = new_uuid_to_bech32("txn_")?;
        let outcome: Result<Transaction, TransactionError<MarketError>> =
            (&self.products, &self.transactions, &self.users).transaction(
                |(products, transactions, users)| {
                    let Some(raw) = products.get(product_id.as_bytes())? else {
                        return abort(MarketError::NotFound(PRODUCT_NOT_FOUND));
                    };
                    let mut product: Product = decode_or_abort(&raw)?;
                    if product.status != ProductStatus::Listed {
                        return abort(MarketError::Conflict(PRODUCT_UNAVAILABLE));
                    }

                    let now = TimeStamp::new();
                    let record = Transaction {
                        id: transaction_id.clone(),
                        product: product.id.clone(),
                        buyer: buyer_id.to_owned(),
                        seller: product.seller.clone(),
                        price: product.price,
                        delivery: delivery.clone(),
                        status: TransactionStatus::Purchased,
                        eco_impact: product.eco_impact,
                        created_at: now.clone(),
                        updated_at: now.clone(),
                    };
                    transactions.insert(record.id.as_bytes(), encode_or_abort(&record)?)?;

                    product.status = ProductStatus::Sold;
                    product.updated_at = now;
                    products.insert(product.id.as_bytes(), encode_or_abort(&product)?)?;

                    // both ledgers move in the same commit as the sale itself
                    if record.buyer == record.seller {
                        let delta =
                            StatsDelta::purchase(record.eco_impact).merge(StatsDelta::sale());
                        credit_in_txn(users, &record.buyer, delta)?;
                    } else {
                        credit_in_txn(users, &record.buyer, StatsDelta::purchase(record.eco_impact))?;
                        credit_in_txn(users, &record.seller, StatsDelta::sale())?;
                    }

                    Ok(record)
                },
            );

        match outcome {
            Ok(record) => {
                info!(
                    transaction = %record.id,
                    product = %product_id,
                    buyer = %buyer_id,
                    "settled purchase"
                );
                Ok(record)
            }
            Err(TransactionError::Abort(err)) => Err(err),
            Err(TransactionError::Storage(err)) => Err(MarketError::Storage(err)),
        }
    }

    /// Settlements where the user is the buyer, newest first
    pub fn purchases(&self, buyer_id: &str) -> Result<Vec<Transaction>, MarketError> {
        let mut found: Vec<Transaction> = scan(&self.transactions, |record: &Transaction| {
            record.buyer == buyer_id
        })?;
        found.sort_by(|a, b| {
            b.created_at
                .to_datetime_utc()
                .cmp(&a.created_at.to_datetime_utc())
        });
        Ok(found)
    }

    /// Settlements where the user is the seller, newest first
    pub fn sales(&self, seller_id: &str) -> Result<Vec<Transaction>, MarketError> {
        let mut found: Vec<Transaction> = scan(&self.transactions, |record: &Transaction| {
            record.seller == seller_id
        })?;
        found.sort_by(|a, b| {
            b.created_at
                .to_datetime_utc()
                .cmp(&a.created_at.to_datetime_utc())
        });
        Ok(found)
    }

    /// Move a settlement along its fulfilment path. Only the buyer or the
    /// seller may touch it, and the configured policy decides which moves
    /// are legal.
    pub fn update_transaction_status(
        &self,
        transaction_id: &str,
        actor: &str,
        status: TransactionStatus,
    ) -> Result<Transaction, MarketError> {
        let policy = self.config.transitions;
        let record = update_record(
            &self.transactions,
            transaction_id,
            TRANSACTION_NOT_FOUND,
            |record: &mut Transaction| {
                record.ensure_participant(actor)?;
                if !policy.permits(record.status, status) {
                    return Err(MarketError::Conflict(INVALID_TRANSITION));
                }
                record.status = status;
                record.updated_at = TimeStamp::new();
                Ok(())
            },
        )?;
        info!(transaction = %record.id, status = ?record.status, "updated transaction status");
        Ok(record)
    }
}

/// Decode one record out of a tree, NotFound with `missing` when absent
fn load_record<T>(tree: &Tree, id: &str, missing: &'static str) -> Result<T, MarketError>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    let Some(raw) = tree.get(id.as_bytes())? else {
        return Err(MarketError::NotFound(missing));
    };
    Ok(minicbor::decode(&raw)?)
}

/// Read-modify-write under compare-and-swap. The closure runs again on every
/// retry, so checks inside it always see the bytes the swap will replace.
fn update_record<T, F>(
    tree: &Tree,
    id: &str,
    missing: &'static str,
    mutate: F,
) -> Result<T, MarketError>
where
    T: minicbor::Encode<()> + for<'b> minicbor::Decode<'b, ()>,
    F: Fn(&mut T) -> Result<(), MarketError>,
{
    loop {
        let Some(old) = tree.get(id.as_bytes())? else {
            return Err(MarketError::NotFound(missing));
        };
        let mut record: T = minicbor::decode(&old)?;
        mutate(&mut record)?;

        let new = minicbor::to_vec(&record)?;
        if tree
            .compare_and_swap(id.as_bytes(), Some(&old), Some(new))?
            .is_ok()
        {
            return Ok(record);
        }
    }
}

/// Decode every record in a tree that passes `keep`
fn scan<T, F>(tree: &Tree, keep: F) -> Result<Vec<T>, MarketError>
where
    T: for<'b> minicbor::Decode<'b, ()>,
    F: Fn(&T) -> bool,
{
    let mut found = Vec::new();
    for entry in tree.iter() {
        let (_, raw) = entry?;
        let record: T = minicbor::decode(&raw)?;
        if keep(&record) {
            found.push(record);
        }
    }
    Ok(found)
}

// Codec failures inside the settlement closure must abort the whole commit
fn encode_or_abort<T: minicbor::Encode<()>>(
    value: &T,
) -> Result<Vec<u8>, ConflictableTransactionError<MarketError>> {
    minicbor::to_vec(value)
        .map_err(|err| ConflictableTransactionError::Abort(MarketError::Encode(err)))
}

fn decode_or_abort<T: for<'b> minicbor::Decode<'b, ()>>(
    raw: &[u8],
) -> Result<T, ConflictableTransactionError<MarketError>> {
    minicbor::decode(raw)
        .map_err(|err| ConflictableTransactionError::Abort(MarketError::Decode(err)))
}

// Ledger write inside the settlement transaction. A missing user aborts the
// whole settlement rather than leaving a half-credited sale behind.
fn credit_in_txn(
    users: &TransactionalTree,
    user_id: &str,
    delta: StatsDelta,
) -> Result<(), ConflictableTransactionError<MarketError>> {
    let Some(raw) = users.get(user_id.as_bytes())? else {
        return Err(ConflictableTransactionError::Abort(MarketError::NotFound(
            USER_NOT_FOUND,
        )));
    };
    let mut user: UserProfile = decode_or_abort(&raw)?;
    user.eco_stats.apply(&delta);
    users.insert(user_id.as_bytes(), encode_or_abort(&user)?)?;
    Ok(())
}
