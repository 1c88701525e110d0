//! Listing management
//!
//! Object-level access rules live here: who may see a property, who may
//! change it and who may hand it to an agent.

use common::error::DatabaseResult;
use common::mail::{MailJob, MailQueue};
use common::pagination::{Page, PageParams};
use common::token::{EmailTokenService, TokenPurpose};
use common::user::CurrentUser;
use common::validation::{FieldErrors, REQUIRED};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    AgentConfirmRequest, AgentRequest, CreatePropertyRequest, Image, ImageRequest, Location,
    LocationRequest, Property, PropertyFilters, PropertyResponse, RentDetails,
    RentDetailsRequest, UpdatePropertyRequest,
};
use crate::repositories::{
    FavoriteRepository, ImageRepository, PropertyRepository, UserRepository,
};

/// Anyone for public listings; otherwise the owner, the agent and staff
pub fn can_view(property: &Property, viewer: Option<&CurrentUser>) -> bool {
    property.is_public()
        || viewer.is_some_and(|u| {
            property.owner_id == u.id()
                || property.agent_id == Some(u.id())
                || u.user.is_admin()
                || u.user.is_moderator()
        })
}

/// The owner, the managing agent and administrators
pub fn can_manage(property: &Property, user: &CurrentUser) -> bool {
    property.owner_id == user.id() || property.agent_id == Some(user.id()) || user.user.is_admin()
}

/// Listing operations
#[derive(Clone)]
pub struct PropertyService {
    properties: Arc<dyn PropertyRepository>,
    images: Arc<dyn ImageRepository>,
    favorites: Arc<dyn FavoriteRepository>,
    users: Arc<dyn UserRepository>,
    mail_queue: Arc<dyn MailQueue>,
    email_tokens: EmailTokenService,
    public_url: String,
}

impl PropertyService {
    pub fn new(
        properties: Arc<dyn PropertyRepository>,
        images: Arc<dyn ImageRepository>,
        favorites: Arc<dyn FavoriteRepository>,
        users: Arc<dyn UserRepository>,
        mail_queue: Arc<dyn MailQueue>,
        email_tokens: EmailTokenService,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            properties,
            images,
            favorites,
            users,
            mail_queue,
            email_tokens,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn users(&self) -> &dyn UserRepository {
        self.users.as_ref()
    }

    /// Whether the user owns at least one property
    pub async fn owns_any(&self, user_id: Uuid) -> DatabaseResult<bool> {
        self.properties.owns_any(user_id).await
    }

    fn list_url(&self, path: &str) -> String {
        format!("{}/api/v1/properties/{}", self.public_url, path)
    }

    /// Push a mail job; a broker failure is logged and not surfaced
    async fn send(&self, job: MailJob) {
        let kind = job.kind();
        if let Err(e) = self.mail_queue.enqueue(job).await {
            error!("Failed to queue {} mail: {}", kind, e);
        }
    }

    /// Attach location, rent details and images
    async fn expand(&self, property: Property) -> ApiResult<PropertyResponse> {
        let location = self.properties.find_location(property.id).await?;
        let rent_details = self.properties.find_rent_details(property.id).await?;
        let images = self.images.list(property.id).await?;
        Ok(PropertyResponse::new(property, location, rent_details, images))
    }

    async fn expand_page(&self, page: Page<Property>) -> ApiResult<Page<PropertyResponse>> {
        let mut results = Vec::with_capacity(page.results.len());
        for property in page.results {
            results.push(self.expand(property).await?);
        }
        Ok(Page {
            count: page.count,
            next: page.next,
            previous: page.previous,
            results,
        })
    }

    /// A property the viewer may see; hidden ones are reported as missing
    async fn visible(&self, id: Uuid, viewer: Option<&CurrentUser>) -> ApiResult<Property> {
        self.properties
            .find_by_id(id)
            .await?
            .filter(|p| can_view(p, viewer))
            .ok_or_else(ApiError::property_not_found)
    }

    /// A property the user may change
    async fn managed(&self, id: Uuid, user: &CurrentUser) -> ApiResult<Property> {
        let property = self.visible(id, Some(user)).await?;
        if !can_manage(&property, user) {
            return Err(ApiError::Forbidden);
        }
        Ok(property)
    }

    /// A property the user owns
    async fn owned(&self, id: Uuid, user: &CurrentUser) -> ApiResult<Property> {
        let property = self.visible(id, Some(user)).await?;
        if property.owner_id != user.id() {
            return Err(ApiError::Forbidden);
        }
        Ok(property)
    }

    /// Public listing
    pub async fn list(&self, filters: &PropertyFilters) -> ApiResult<Page<PropertyResponse>> {
        let params = filters.page_params();
        let (properties, count) = self
            .properties
            .list_public(filters, params.offset(), params.limit())
            .await?;
        let page = Page::new(properties, count, &params, &self.list_url(""));
        self.expand_page(page).await
    }

    /// The caller's own listings, listed or not
    pub async fn mine(
        &self,
        user: &CurrentUser,
        params: &PageParams,
    ) -> ApiResult<Page<PropertyResponse>> {
        let (properties, count) = self
            .properties
            .list_by_owner(user.id(), params.offset(), params.limit())
            .await?;
        let page = Page::new(properties, count, params, &self.list_url("mine/"));
        self.expand_page(page).await
    }

    pub async fn get(
        &self,
        id: Uuid,
        viewer: Option<&CurrentUser>,
    ) -> ApiResult<PropertyResponse> {
        let property = self.visible(id, viewer).await?;
        self.expand(property).await
    }

    /// Create a listing owned by the caller
    pub async fn create(
        &self,
        user: &CurrentUser,
        request: CreatePropertyRequest,
    ) -> ApiResult<PropertyResponse> {
        let new = request.into_new(user.id())?;

        let created = self.properties.create(&new).await?;

        info!("User {} created property {}", user.id(), created.property.id);
        Ok(PropertyResponse::new(
            created.property,
            created.location,
            created.rent_details,
            Vec::new(),
        ))
    }

    pub async fn update(
        &self,
        id: Uuid,
        user: &CurrentUser,
        request: UpdatePropertyRequest,
    ) -> ApiResult<PropertyResponse> {
        let property = self.managed(id, user).await?;
        let property = request.apply(property)?;
        let property = self.properties.update(&property).await?;

        info!("User {} updated property {}", user.id(), property.id);
        self.expand(property).await
    }

    /// Remove a listing; the managing agent may not
    pub async fn delete(&self, id: Uuid, user: &CurrentUser) -> ApiResult<()> {
        let property = self.visible(id, Some(user)).await?;
        if property.owner_id != user.id() && !user.user.is_admin() {
            return Err(ApiError::Forbidden);
        }

        self.properties.delete(property.id).await?;
        info!("User {} deleted property {}", user.id(), property.id);
        Ok(())
    }

    pub async fn put_location(
        &self,
        id: Uuid,
        user: &CurrentUser,
        request: LocationRequest,
    ) -> ApiResult<Location> {
        let property = self.managed(id, user).await?;
        let location = request.into_location(property.id)?;
        Ok(self.properties.upsert_location(&location).await?)
    }

    pub async fn delete_location(&self, id: Uuid, user: &CurrentUser) -> ApiResult<()> {
        let property = self.managed(id, user).await?;
        if !self.properties.delete_location(property.id).await? {
            return Err(ApiError::NotFound("Location not found".to_string()));
        }
        Ok(())
    }

    pub async fn put_rent_details(
        &self,
        id: Uuid,
        user: &CurrentUser,
        request: RentDetailsRequest,
    ) -> ApiResult<RentDetails> {
        let property = self.managed(id, user).await?;
        let details = request.into_rent_details(property.id)?;
        Ok(self.properties.upsert_rent_details(&details).await?)
    }

    pub async fn delete_rent_details(&self, id: Uuid, user: &CurrentUser) -> ApiResult<()> {
        let property = self.managed(id, user).await?;
        if !self.properties.delete_rent_details(property.id).await? {
            return Err(ApiError::NotFound("Rent details not found".to_string()));
        }
        Ok(())
    }

    pub async fn add_image(
        &self,
        id: Uuid,
        user: &CurrentUser,
        request: ImageRequest,
    ) -> ApiResult<Image> {
        let property = self.managed(id, user).await?;
        let image = request.into_image(property.id)?;
        Ok(self.images.add(&image).await?)
    }

    pub async fn delete_image(
        &self,
        id: Uuid,
        image_id: Uuid,
        user: &CurrentUser,
    ) -> ApiResult<()> {
        let property = self.managed(id, user).await?;
        if !self.images.delete(property.id, image_id).await? {
            return Err(ApiError::NotFound("Image not found".to_string()));
        }
        Ok(())
    }

    pub async fn favorites(
        &self,
        user: &CurrentUser,
        params: &PageParams,
    ) -> ApiResult<Page<PropertyResponse>> {
        let staff = user.user.is_admin() || user.user.is_moderator();
        let (properties, count) = self
            .favorites
            .list(user.id(), staff, params.offset(), params.limit())
            .await?;
        let page = Page::new(properties, count, params, &self.list_url("favorites/"));
        self.expand_page(page).await
    }

    /// Save a property; saving it twice is not an error
    pub async fn add_favorite(&self, id: Uuid, user: &CurrentUser) -> ApiResult<()> {
        let property = self.visible(id, Some(user)).await?;
        if self.favorites.add(user.id(), property.id).await? {
            info!("User {} saved property {}", user.id(), property.id);
        }
        Ok(())
    }

    pub async fn remove_favorite(&self, id: Uuid, user: &CurrentUser) -> ApiResult<()> {
        if !self.favorites.remove(user.id(), id).await? {
            return Err(ApiError::NotFound(
                "Property is not in favorites".to_string(),
            ));
        }
        Ok(())
    }

    /// Ask an agent to manage the caller's property
    pub async fn assign_agent(
        &self,
        id: Uuid,
        user: &CurrentUser,
        request: AgentRequest,
    ) -> ApiResult<()> {
        let mut property = self.owned(id, user).await?;

        let agent_id = request
            .agent_id
            .ok_or_else(|| FieldErrors::single("agent_id", REQUIRED))?;
        let agent = self
            .users
            .find_by_id(agent_id)
            .await?
            .filter(|a| a.is_active && a.is_agent())
            .ok_or_else(|| FieldErrors::single("agent_id", "User is not an agent"))?;

        if property.agent_id == Some(agent.id) {
            return Err(ApiError::BadRequest(
                "This agent already manages the property".to_string(),
            ));
        }

        property.pending_agent_id = Some(agent.id);
        let property = self.properties.update(&property).await?;

        let token = self
            .email_tokens
            .issue(&agent.email, TokenPurpose::AgentAssignment)?;
        let confirm_link = format!(
            "{}?token={}",
            self.list_url(&format!("{}/agent_confirm/", property.id)),
            token
        );

        self.send(MailJob::AgentAssignment {
            agent_username: agent.username.clone(),
            agent_email: agent.email.clone(),
            owner_username: user.user.username.clone(),
            property_title: property.title.clone(),
            confirm_link,
        })
        .await;

        info!("Agent {} asked to manage property {}", agent.id, property.id);
        Ok(())
    }

    /// The pending agent accepts or declines; returns whether it accepted
    pub async fn confirm_agent(
        &self,
        id: Uuid,
        user: &CurrentUser,
        token: Option<&str>,
        request: AgentConfirmRequest,
    ) -> ApiResult<bool> {
        let token = token.ok_or(common::error::TokenError::Invalid)?;
        let email = self
            .email_tokens
            .verify(token, TokenPurpose::AgentAssignment)?;

        let mut property = self
            .properties
            .find_by_id(id)
            .await?
            .ok_or_else(ApiError::property_not_found)?;

        let Some(pending) = property.pending_agent_id else {
            return Err(ApiError::BadRequest(
                "No agent assignment is pending".to_string(),
            ));
        };
        if pending != user.id() || !email.eq_ignore_ascii_case(&user.user.email) {
            return Err(ApiError::Forbidden);
        }

        let accept = request
            .accept
            .ok_or_else(|| FieldErrors::single("accept", REQUIRED))?;

        let owner = self
            .users
            .find_by_id(property.owner_id)
            .await?
            .ok_or_else(|| ApiError::Internal(format!("Owner of {} is missing", property.id)))?;

        property.pending_agent_id = None;
        if accept {
            property.agent_id = Some(user.id());
        }
        let property = self.properties.update(&property).await?;

        let owner_username = owner.username;
        let owner_email = owner.email;
        let agent_username = user.user.username.clone();
        let property_title = property.title.clone();
        let job = if accept {
            MailJob::AgentAccepted {
                owner_username,
                owner_email,
                agent_username,
                property_title,
            }
        } else {
            MailJob::AgentDeclined {
                owner_username,
                owner_email,
                agent_username,
                property_title,
            }
        };
        self.send(job).await;

        info!(
            "Agent {} {} property {}",
            user.id(),
            if accept { "accepted" } else { "declined" },
            property.id
        );
        Ok(accept)
    }

    /// Drop the agent and any pending request
    pub async fn remove_agent(&self, id: Uuid, user: &CurrentUser) -> ApiResult<()> {
        let mut property = self.owned(id, user).await?;
        if property.agent_id.is_none() && property.pending_agent_id.is_none() {
            return Err(ApiError::NotFound("Property has no agent".to_string()));
        }

        property.agent_id = None;
        property.pending_agent_id = None;
        self.properties.update(&property).await?;

        info!("Agent removed from property {}", property.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::MemoryStore;
    use chrono::{NaiveDate, Utc};
    use common::mail::MemoryMailQueue;
    use common::user::{Role, User};
    use crate::models::{Money, PropertyType};

    struct Harness {
        service: PropertyService,
        store: MemoryStore,
        queue: MemoryMailQueue,
        tokens: EmailTokenService,
    }

    fn harness() -> Harness {
        let store = MemoryStore::new();
        let queue = MemoryMailQueue::new();
        let tokens = EmailTokenService::new("test-secret-key").unwrap();
        let service = PropertyService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(queue.clone()),
            tokens.clone(),
            "http://localhost",
        );
        Harness {
            service,
            store,
            queue,
            tokens,
        }
    }

    impl Harness {
        fn user(&self, username: &str, role: Role) -> CurrentUser {
            let mut user = User::new(&format!("{}@example.com", username), username, "hash");
            user.role = role;
            user.is_active = true;
            user.email_verified = true;
            self.store.insert_user(user.clone());
            CurrentUser {
                user,
                is_owner: false,
            }
        }

        fn property(&self, owner: &CurrentUser, listed: bool) -> Property {
            let now = Utc::now();
            let property = Property {
                id: Uuid::new_v4(),
                owner_id: owner.id(),
                agent_id: None,
                pending_agent_id: None,
                title: "Loft".to_string(),
                description: "Open plan".to_string(),
                price: Money::new(30000000, "USD"),
                bedrooms: 1,
                bathrooms: 1,
                property_type: PropertyType::Apartment,
                features: Vec::new(),
                total_floors: None,
                floor_number: None,
                built: NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
                listed,
                active: true,
                for_sale: true,
                created_at: now,
                updated_at: now,
            };
            self.store.insert_property(property.clone());
            property
        }
    }

    fn image(path: &str, main: bool) -> ImageRequest {
        ImageRequest {
            image: Some(path.to_string()),
            main: Some(main),
        }
    }

    #[tokio::test]
    async fn test_unlisted_property_visibility() {
        let h = harness();
        let owner = h.user("owner", Role::User);
        let stranger = h.user("stranger", Role::User);
        let moderator = h.user("moderator", Role::Moderator);
        let property = h.property(&owner, false);

        assert!(h.service.get(property.id, Some(&owner)).await.is_ok());
        assert!(h.service.get(property.id, Some(&moderator)).await.is_ok());
        assert!(matches!(
            h.service.get(property.id, Some(&stranger)).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            h.service.get(property.id, None).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_only_public_properties_are_listed() {
        let h = harness();
        let owner = h.user("owner", Role::User);
        let listed = h.property(&owner, true);
        h.property(&owner, false);

        let page = h.service.list(&PropertyFilters::default()).await.unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].id, listed.id);

        let mine = h
            .service
            .mine(&owner, &PageParams::default())
            .await
            .unwrap();
        assert_eq!(mine.count, 2);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let h = harness();
        let owner = h.user("owner", Role::User);
        let cheap = h.property(&owner, true);
        let mut pricey = h.property(&owner, true);
        pricey.price = Money::new(90000000, "USD");
        pricey.bedrooms = 4;
        h.store.insert_property(pricey.clone());

        let filters = PropertyFilters {
            max_price: Some(50000000),
            ..Default::default()
        };
        let page = h.service.list(&filters).await.unwrap();
        assert!(page.results.iter().all(|p| p.id == cheap.id));

        let filters = PropertyFilters {
            bedrooms: Some(3),
            ..Default::default()
        };
        let page = h.service.list(&filters).await.unwrap();
        assert!(page.results.iter().all(|p| p.id == pricey.id));
        assert!(!page.results.is_empty());
    }

    #[tokio::test]
    async fn test_setting_main_image_clears_previous_main() {
        let h = harness();
        let owner = h.user("owner", Role::User);
        let property = h.property(&owner, true);

        let first = h
            .service
            .add_image(property.id, &owner, image("images/front.jpg", true))
            .await
            .unwrap();
        let second = h
            .service
            .add_image(property.id, &owner, image("images/garden.jpg", true))
            .await
            .unwrap();
        h.service
            .add_image(property.id, &owner, image("images/kitchen.jpg", false))
            .await
            .unwrap();

        let images = h.store.images_of(property.id);
        let mains: Vec<_> = images.iter().filter(|i| i.main).collect();
        assert_eq!(mains.len(), 1);
        assert_eq!(mains[0].id, second.id);
        assert!(images.iter().any(|i| i.id == first.id && !i.main));

        let detail = h.service.get(property.id, None).await.unwrap();
        assert_eq!(detail.images[0].id, second.id);
    }

    #[tokio::test]
    async fn test_strangers_cannot_manage() {
        let h = harness();
        let owner = h.user("owner", Role::User);
        let stranger = h.user("stranger", Role::User);
        let admin = h.user("admin", Role::Admin);
        let property = h.property(&owner, true);

        let err = h
            .service
            .add_image(property.id, &stranger, image("images/x.jpg", false))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));

        let err = h.service.delete(property.id, &stranger).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));

        h.service.delete(property.id, &admin).await.unwrap();
        assert!(h.store.property(property.id).is_none());
    }

    #[tokio::test]
    async fn test_location_is_one_to_one() {
        let h = harness();
        let owner = h.user("owner", Role::User);
        let property = h.property(&owner, true);
        let location = |city: &str| LocationRequest {
            address: Some("1 Main St".to_string()),
            city: Some(city.to_string()),
            state: Some("CA".to_string()),
            zipcode: Some("94105".to_string()),
            country: Some("USA".to_string()),
            latitude: None,
            longitude: None,
        };

        h.service
            .put_location(property.id, &owner, location("Oakland"))
            .await
            .unwrap();
        h.service
            .put_location(property.id, &owner, location("San Francisco"))
            .await
            .unwrap();

        let detail = h.service.get(property.id, None).await.unwrap();
        assert_eq!(detail.location.unwrap().city, "San Francisco");

        h.service.delete_location(property.id, &owner).await.unwrap();
        let err = h
            .service
            .delete_location(property.id, &owner)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_favorites_add_is_idempotent_and_remove_reports_absence() {
        let h = harness();
        let owner = h.user("owner", Role::User);
        let fan = h.user("fan", Role::User);
        let property = h.property(&owner, true);

        h.service.add_favorite(property.id, &fan).await.unwrap();
        h.service.add_favorite(property.id, &fan).await.unwrap();
        assert_eq!(h.store.favorite_count(fan.id()), 1);

        let page = h
            .service
            .favorites(&fan, &PageParams::default())
            .await
            .unwrap();
        assert_eq!(page.count, 1);

        h.service.remove_favorite(property.id, &fan).await.unwrap();
        let err = h
            .service
            .remove_favorite(property.id, &fan)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_favorites_hide_properties_unlisted_later() {
        let h = harness();
        let owner = h.user("owner", Role::User);
        let fan = h.user("fan", Role::User);
        let moderator = h.user("moderator", Role::Moderator);
        let property = h.property(&owner, true);

        h.service.add_favorite(property.id, &fan).await.unwrap();
        h.service.add_favorite(property.id, &owner).await.unwrap();
        h.service.add_favorite(property.id, &moderator).await.unwrap();

        h.service
            .update(
                property.id,
                &owner,
                UpdatePropertyRequest {
                    listed: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let page = h
            .service
            .favorites(&fan, &PageParams::default())
            .await
            .unwrap();
        assert_eq!(page.count, 0);
        assert!(page.results.is_empty());

        for viewer in [&owner, &moderator] {
            let page = h
                .service
                .favorites(viewer, &PageParams::default())
                .await
                .unwrap();
            assert_eq!(page.count, 1);
        }
    }

    #[tokio::test]
    async fn test_agent_assignment_accepted() {
        let h = harness();
        let owner = h.user("owner", Role::User);
        let agent = h.user("agent", Role::Agent);
        let property = h.property(&owner, true);

        h.service
            .assign_agent(
                property.id,
                &owner,
                AgentRequest {
                    agent_id: Some(agent.id()),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            h.store.property(property.id).unwrap().pending_agent_id,
            Some(agent.id())
        );

        let link = match &h.queue.sent()[0] {
            MailJob::AgentAssignment {
                agent_email,
                confirm_link,
                ..
            } => {
                assert_eq!(agent_email, "agent@example.com");
                confirm_link.clone()
            }
            other => panic!("unexpected mail {:?}", other),
        };
        let token = link.split("?token=").nth(1).unwrap();

        let accepted = h
            .service
            .confirm_agent(
                property.id,
                &agent,
                Some(token),
                AgentConfirmRequest { accept: Some(true) },
            )
            .await
            .unwrap();
        assert!(accepted);

        let stored = h.store.property(property.id).unwrap();
        assert_eq!(stored.agent_id, Some(agent.id()));
        assert_eq!(stored.pending_agent_id, None);
        assert_eq!(h.queue.sent()[1].kind(), "agent_accepted");
        assert_eq!(h.queue.sent()[1].recipient(), "owner@example.com");

        // the managing agent may now edit the listing
        let update = UpdatePropertyRequest {
            title: Some("Renovated loft".to_string()),
            ..Default::default()
        };
        let updated = h.service.update(property.id, &agent, update).await.unwrap();
        assert_eq!(updated.title, "Renovated loft");
    }

    #[tokio::test]
    async fn test_agent_assignment_declined() {
        let h = harness();
        let owner = h.user("owner", Role::User);
        let agent = h.user("agent", Role::Agent);
        let mut property = h.property(&owner, true);
        property.pending_agent_id = Some(agent.id());
        h.store.insert_property(property.clone());
        let token = h
            .tokens
            .issue(&agent.user.email, TokenPurpose::AgentAssignment)
            .unwrap();

        let accepted = h
            .service
            .confirm_agent(
                property.id,
                &agent,
                Some(&token),
                AgentConfirmRequest {
                    accept: Some(false),
                },
            )
            .await
            .unwrap();
        assert!(!accepted);

        let stored = h.store.property(property.id).unwrap();
        assert_eq!(stored.agent_id, None);
        assert_eq!(stored.pending_agent_id, None);
        assert_eq!(h.queue.sent()[0].kind(), "agent_declined");
    }

    #[tokio::test]
    async fn test_agent_assignment_rejections() {
        let h = harness();
        let owner = h.user("owner", Role::User);
        let agent = h.user("agent", Role::Agent);
        let plain = h.user("plain", Role::User);
        let property = h.property(&owner, true);

        let err = h
            .service
            .assign_agent(
                property.id,
                &owner,
                AgentRequest {
                    agent_id: Some(plain.id()),
                },
            )
            .await
            .unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.get("agent_id").unwrap(), ["User is not an agent"])
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = h
            .service
            .assign_agent(
                property.id,
                &agent,
                AgentRequest {
                    agent_id: Some(agent.id()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));

        // an activation token cannot confirm an assignment
        let token = h
            .tokens
            .issue(&agent.user.email, TokenPurpose::Activation)
            .unwrap();
        let err = h
            .service
            .confirm_agent(
                property.id,
                &agent,
                Some(&token),
                AgentConfirmRequest { accept: Some(true) },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg == "Invalid token"));
        assert_eq!(h.queue.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_agent() {
        let h = harness();
        let owner = h.user("owner", Role::User);
        let agent = h.user("agent", Role::Agent);
        let mut property = h.property(&owner, true);

        let err = h.service.remove_agent(property.id, &owner).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        property.agent_id = Some(agent.id());
        h.store.insert_property(property.clone());
        let err = h.service.remove_agent(property.id, &agent).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));

        h.service.remove_agent(property.id, &owner).await.unwrap();
        assert_eq!(h.store.property(property.id).unwrap().agent_id, None);
    }
}
