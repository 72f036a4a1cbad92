// Wiring: stores → services → router. Everything is built once at startup
// and passed down explicitly.

use axum::{extract::DefaultBodyLimit, http::HeaderValue, middleware::from_fn_with_state, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::database::models::{
    Attachment, Examination, Facility, FacilityLink, ImageAsset, ImageSeries, Individual, Practitioner,
};
use crate::database::{DatabaseManager, MemoryRepository, PgRepository, Repository};
use crate::handlers::{examinations, facilities, individuals, practitioners, public};
use crate::middleware::{jwt_auth_middleware, SecurityContext};
use crate::services::{ExaminationService, ExaminationStores, FacilityService, IndividualService, PractitionerService};
use crate::siblings::{AssociationChecks, LocalSiblings, PractitionerLookup};
use crate::types::ServiceKind;

/// What the health endpoint probes
#[derive(Clone)]
pub enum StoreBackend {
    Memory,
    Postgres(DatabaseManager),
}

/// One repository per record kind
#[derive(Clone)]
pub struct Stores {
    pub practitioners: Arc<dyn Repository<Practitioner>>,
    pub facilities: Arc<dyn Repository<Facility>>,
    pub links: Arc<dyn Repository<FacilityLink>>,
    pub individuals: Arc<dyn Repository<Individual>>,
    pub examinations: ExaminationStores,
    pub backend: StoreBackend,
}

impl Stores {
    pub fn memory() -> Self {
        Self {
            practitioners: Arc::new(MemoryRepository::<Practitioner>::new()),
            facilities: Arc::new(MemoryRepository::<Facility>::new()),
            links: Arc::new(MemoryRepository::<FacilityLink>::new()),
            individuals: Arc::new(MemoryRepository::<Individual>::new()),
            examinations: ExaminationStores {
                examinations: Arc::new(MemoryRepository::<Examination>::new()),
                series: Arc::new(MemoryRepository::<ImageSeries>::new()),
                assets: Arc::new(MemoryRepository::<ImageAsset>::new()),
                attachments: Arc::new(MemoryRepository::<Attachment>::new()),
            },
            backend: StoreBackend::Memory,
        }
    }

    pub fn postgres(manager: DatabaseManager) -> Self {
        let pool = manager.pool();
        Self {
            practitioners: Arc::new(PgRepository::<Practitioner>::new(pool.clone())),
            facilities: Arc::new(PgRepository::<Facility>::new(pool.clone())),
            links: Arc::new(PgRepository::<FacilityLink>::new(pool.clone())),
            individuals: Arc::new(PgRepository::<Individual>::new(pool.clone())),
            examinations: ExaminationStores {
                examinations: Arc::new(PgRepository::<Examination>::new(pool.clone())),
                series: Arc::new(PgRepository::<ImageSeries>::new(pool.clone())),
                assets: Arc::new(PgRepository::<ImageAsset>::new(pool.clone())),
                attachments: Arc::new(PgRepository::<Attachment>::new(pool)),
            },
            backend: StoreBackend::Postgres(manager),
        }
    }

    /// Sibling answers from this process's own repositories
    pub fn local_siblings(&self) -> LocalSiblings {
        LocalSiblings::new(self.practitioners.clone(), self.links.clone(), self.individuals.clone())
    }
}

/// The services mounted in this process
#[derive(Clone)]
pub struct Services {
    pub practitioners: Option<Arc<PractitionerService>>,
    pub facilities: Option<Arc<FacilityService>>,
    pub individuals: Option<Arc<IndividualService>>,
    pub examinations: Option<Arc<ExaminationService>>,
    pub backend: StoreBackend,
}

impl Services {
    pub fn assemble(
        stores: &Stores,
        mounted: &[ServiceKind],
        lookup: Arc<dyn PractitionerLookup>,
        checks: Arc<dyn AssociationChecks>,
    ) -> Self {
        let wants = |kind: ServiceKind| mounted.contains(&kind);

        Self {
            practitioners: wants(ServiceKind::Practitioner)
                .then(|| Arc::new(PractitionerService::new(stores.practitioners.clone()))),
            facilities: wants(ServiceKind::Facility).then(|| {
                Arc::new(FacilityService::new(
                    stores.facilities.clone(),
                    stores.links.clone(),
                    lookup.clone(),
                ))
            }),
            individuals: wants(ServiceKind::Individual)
                .then(|| Arc::new(IndividualService::new(stores.individuals.clone()))),
            examinations: wants(ServiceKind::Examination)
                .then(|| Arc::new(ExaminationService::new(stores.examinations.clone(), checks.clone()))),
            backend: stores.backend.clone(),
        }
    }

    /// Every service in one process, siblings answered locally
    pub fn all_local(stores: &Stores) -> Self {
        let local = Arc::new(stores.local_siblings());
        Self::assemble(stores, &ServiceKind::ALL, local.clone(), local)
    }

    pub fn mounted(&self) -> Vec<ServiceKind> {
        let mut kinds = Vec::new();
        if self.practitioners.is_some() {
            kinds.push(ServiceKind::Practitioner);
        }
        if self.facilities.is_some() {
            kinds.push(ServiceKind::Facility);
        }
        if self.individuals.is_some() {
            kinds.push(ServiceKind::Individual);
        }
        if self.examinations.is_some() {
            kinds.push(ServiceKind::Examination);
        }
        kinds
    }
}

#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub request_logging: bool,
    pub max_request_size_bytes: usize,
}

impl RouterOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            enable_cors: config.security.enable_cors,
            cors_origins: config.security.cors_origins.clone(),
            request_logging: config.api.enable_request_logging,
            max_request_size_bytes: config.api.max_request_size_bytes,
        }
    }
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            enable_cors: false,
            cors_origins: Vec::new(),
            request_logging: false,
            max_request_size_bytes: 2 * 1024 * 1024,
        }
    }
}

pub fn build_router(services: &Services, security: SecurityContext, options: &RouterOptions) -> Router {
    let mut router = public::routes(public::PublicState {
        mounted: Arc::new(services.mounted()),
        backend: services.backend.clone(),
    });

    if let Some(service) = &services.practitioners {
        router = router
            .merge(practitioners::routes(service.clone()))
            .merge(practitioners::internal_routes(service.clone()));
    }
    if let Some(service) = &services.facilities {
        router = router
            .merge(facilities::routes(service.clone()))
            .merge(facilities::internal_routes(service.clone()));
    }
    if let Some(service) = &services.individuals {
        router = router
            .merge(individuals::routes(service.clone()))
            .merge(individuals::internal_routes(service.clone()));
    }
    if let Some(service) = &services.examinations {
        router = router
            .merge(examinations::routes(service.clone()))
            .merge(examinations::public_routes(service.clone()));
    }

    // Body limit wraps authentication; CORS and tracing wrap both
    router = router.layer(
        ServiceBuilder::new()
            .layer(DefaultBodyLimit::max(options.max_request_size_bytes))
            .layer(from_fn_with_state(security, jwt_auth_middleware)),
    );

    if options.enable_cors {
        router = router.layer(cors_layer(&options.cors_origins));
    }
    if options.request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}
