//! In-memory repositories for handler tests

use async_trait::async_trait;
use chrono::Utc;
use common::error::DatabaseResult;
use common::user::User;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::{FavoriteRepository, ImageRepository, PropertyRepository, UserRepository};
use crate::models::{Image, Location, NewProperty, Property, PropertyFilters, RentDetails};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    /// Insertion order, oldest first
    properties: Vec<Property>,
    locations: HashMap<Uuid, Location>,
    rent_details: HashMap<Uuid, RentDetails>,
    images: Vec<Image>,
    /// (user, property), oldest first
    favorites: Vec<(Uuid, Uuid)>,
}

/// Every table the service touches, behind one lock
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

fn paginate<T>(items: Vec<T>, offset: i64, limit: i64) -> (Vec<T>, i64) {
    let count = items.len() as i64;
    let page = items
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();
    (page, count)
}

fn matches(filters: &PropertyFilters, property: &Property, location: Option<&Location>) -> bool {
    property.is_public()
        && filters.property_type.is_none_or(|t| property.property_type == t)
        && filters.for_sale.is_none_or(|f| property.for_sale == f)
        && filters.min_price.is_none_or(|p| property.price.amount >= p)
        && filters.max_price.is_none_or(|p| property.price.amount <= p)
        && filters.bedrooms.is_none_or(|b| property.bedrooms >= b)
        && filters.owner.is_none_or(|o| property.owner_id == o)
        && filters
            .city
            .as_ref()
            .is_none_or(|c| location.is_some_and(|l| l.city.eq_ignore_ascii_case(c)))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        self.tables.lock().unwrap().users.insert(user.id, user);
    }

    /// Insert a property, or replace the stored one with the same id
    pub fn insert_property(&self, property: Property) {
        let mut tables = self.tables.lock().unwrap();
        match tables.properties.iter().position(|p| p.id == property.id) {
            Some(index) => tables.properties[index] = property,
            None => tables.properties.push(property),
        }
    }

    pub fn property(&self, id: Uuid) -> Option<Property> {
        self.tables
            .lock()
            .unwrap()
            .properties
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn images_of(&self, property_id: Uuid) -> Vec<Image> {
        self.tables
            .lock()
            .unwrap()
            .images
            .iter()
            .filter(|i| i.property_id == property_id)
            .cloned()
            .collect()
    }

    pub fn favorite_count(&self, user_id: Uuid) -> usize {
        self.tables
            .lock()
            .unwrap()
            .favorites
            .iter()
            .filter(|(u, _)| *u == user_id)
            .count()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        Ok(self.tables.lock().unwrap().users.get(&id).cloned())
    }
}

#[async_trait]
impl PropertyRepository for MemoryStore {
    async fn create(&self, new: &NewProperty) -> DatabaseResult<NewProperty> {
        let mut tables = self.tables.lock().unwrap();
        tables.properties.push(new.property.clone());
        if let Some(location) = &new.location {
            tables.locations.insert(location.property_id, location.clone());
        }
        if let Some(details) = &new.rent_details {
            tables.rent_details.insert(details.property_id, details.clone());
        }
        Ok(NewProperty {
            property: new.property.clone(),
            location: new.location.clone(),
            rent_details: new.rent_details.clone(),
        })
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Property>> {
        Ok(self.property(id))
    }

    async fn list_public(
        &self,
        filters: &PropertyFilters,
        offset: i64,
        limit: i64,
    ) -> DatabaseResult<(Vec<Property>, i64)> {
        let tables = self.tables.lock().unwrap();
        let found = tables
            .properties
            .iter()
            .rev()
            .filter(|p| matches(filters, p, tables.locations.get(&p.id)))
            .cloned()
            .collect();
        Ok(paginate(found, offset, limit))
    }

    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> DatabaseResult<(Vec<Property>, i64)> {
        let tables = self.tables.lock().unwrap();
        let found = tables
            .properties
            .iter()
            .rev()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        Ok(paginate(found, offset, limit))
    }

    async fn update(&self, property: &Property) -> DatabaseResult<Property> {
        let mut tables = self.tables.lock().unwrap();
        let mut updated = property.clone();
        updated.updated_at = Utc::now();
        if let Some(slot) = tables.properties.iter_mut().find(|p| p.id == property.id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.properties.len();
        tables.properties.retain(|p| p.id != id);
        tables.locations.remove(&id);
        tables.rent_details.remove(&id);
        tables.images.retain(|i| i.property_id != id);
        tables.favorites.retain(|(_, p)| *p != id);
        Ok(tables.properties.len() < before)
    }

    async fn owns_any(&self, user_id: Uuid) -> DatabaseResult<bool> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .properties
            .iter()
            .any(|p| p.owner_id == user_id))
    }

    async fn find_location(&self, property_id: Uuid) -> DatabaseResult<Option<Location>> {
        Ok(self.tables.lock().unwrap().locations.get(&property_id).cloned())
    }

    async fn upsert_location(&self, location: &Location) -> DatabaseResult<Location> {
        self.tables
            .lock()
            .unwrap()
            .locations
            .insert(location.property_id, location.clone());
        Ok(location.clone())
    }

    async fn delete_location(&self, property_id: Uuid) -> DatabaseResult<bool> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .locations
            .remove(&property_id)
            .is_some())
    }

    async fn find_rent_details(&self, property_id: Uuid) -> DatabaseResult<Option<RentDetails>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .rent_details
            .get(&property_id)
            .cloned())
    }

    async fn upsert_rent_details(&self, details: &RentDetails) -> DatabaseResult<RentDetails> {
        self.tables
            .lock()
            .unwrap()
            .rent_details
            .insert(details.property_id, details.clone());
        Ok(details.clone())
    }

    async fn delete_rent_details(&self, property_id: Uuid) -> DatabaseResult<bool> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .rent_details
            .remove(&property_id)
            .is_some())
    }
}

#[async_trait]
impl ImageRepository for MemoryStore {
    async fn list(&self, property_id: Uuid) -> DatabaseResult<Vec<Image>> {
        let mut images = self.images_of(property_id);
        images.sort_by_key(|i| !i.main);
        Ok(images)
    }

    async fn add(&self, image: &Image) -> DatabaseResult<Image> {
        let mut tables = self.tables.lock().unwrap();
        if image.main {
            for other in tables
                .images
                .iter_mut()
                .filter(|i| i.property_id == image.property_id)
            {
                other.main = false;
            }
        }
        tables.images.push(image.clone());
        Ok(image.clone())
    }

    async fn delete(&self, property_id: Uuid, image_id: Uuid) -> DatabaseResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.images.len();
        tables
            .images
            .retain(|i| !(i.id == image_id && i.property_id == property_id));
        Ok(tables.images.len() < before)
    }
}

#[async_trait]
impl FavoriteRepository for MemoryStore {
    async fn list(
        &self,
        user_id: Uuid,
        staff: bool,
        offset: i64,
        limit: i64,
    ) -> DatabaseResult<(Vec<Property>, i64)> {
        let tables = self.tables.lock().unwrap();
        let found = tables
            .favorites
            .iter()
            .rev()
            .filter(|(u, _)| *u == user_id)
            .filter_map(|(_, p)| tables.properties.iter().find(|prop| prop.id == *p))
            .filter(|p| {
                p.is_public() || p.owner_id == user_id || p.agent_id == Some(user_id) || staff
            })
            .cloned()
            .collect();
        Ok(paginate(found, offset, limit))
    }

    async fn add(&self, user_id: Uuid, property_id: Uuid) -> DatabaseResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        if tables.favorites.contains(&(user_id, property_id)) {
            return Ok(false);
        }
        tables.favorites.push((user_id, property_id));
        Ok(true)
    }

    async fn remove(&self, user_id: Uuid, property_id: Uuid) -> DatabaseResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.favorites.len();
        tables
            .favorites
            .retain(|entry| *entry != (user_id, property_id));
        Ok(tables.favorites.len() < before)
    }
}
