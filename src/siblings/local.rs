use async_trait::async_trait;
use std::sync::Arc;

use super::{AssociationChecks, PractitionerLookup, PractitionerSummary, SiblingError};
use crate::database::models::{FacilityLink, Individual, Practitioner};
use crate::database::{Lookup, Repository};
use crate::types::Scope;

/// Answers sibling questions straight from the repositories of this process
#[derive(Clone)]
pub struct LocalSiblings {
    practitioners: Arc<dyn Repository<Practitioner>>,
    links: Arc<dyn Repository<FacilityLink>>,
    individuals: Arc<dyn Repository<Individual>>,
}

impl LocalSiblings {
    pub fn new(
        practitioners: Arc<dyn Repository<Practitioner>>,
        links: Arc<dyn Repository<FacilityLink>>,
        individuals: Arc<dyn Repository<Individual>>,
    ) -> Self {
        Self {
            practitioners,
            links,
            individuals,
        }
    }
}

#[async_trait]
impl AssociationChecks for LocalSiblings {
    async fn check_association(&self, practitioner_id: i64, facility_id: i64) -> Result<bool, SiblingError> {
        let filter = [
            Lookup::eq("facility_id", facility_id),
            Lookup::eq("practitioner_id", practitioner_id),
        ];
        Ok(self.links.find_one(&filter, Scope::Active).await?.is_some())
    }

    async fn check_individual_exists(&self, individual_id: i64) -> Result<bool, SiblingError> {
        Ok(self.individuals.exists(&individual_id).await?)
    }
}

#[async_trait]
impl PractitionerLookup for LocalSiblings {
    async fn get_practitioner(&self, id: i64) -> Result<Option<PractitionerSummary>, SiblingError> {
        let practitioner = self.practitioners.get(&id, Scope::Active).await?;
        Ok(practitioner.as_ref().map(PractitionerSummary::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{NewFacilityLink, NewIndividual};
    use crate::database::MemoryRepository;
    use chrono::{NaiveDate, Utc};

    fn siblings() -> (LocalSiblings, Arc<MemoryRepository<FacilityLink>>, Arc<MemoryRepository<Individual>>) {
        let links = Arc::new(MemoryRepository::<FacilityLink>::new());
        let individuals = Arc::new(MemoryRepository::<Individual>::new());
        let local = LocalSiblings::new(
            Arc::new(MemoryRepository::<Practitioner>::new()),
            links.clone(),
            individuals.clone(),
        );
        (local, links, individuals)
    }

    #[tokio::test]
    async fn association_requires_an_active_link() {
        let (local, links, _) = siblings();
        let link = links
            .insert(NewFacilityLink {
                facility_id: 10,
                practitioner_id: 1,
            })
            .await
            .unwrap();

        assert!(local.check_association(1, 10).await.unwrap());
        assert!(!local.check_association(10, 1).await.unwrap());

        links.soft_delete(&link.id, Utc::now()).await.unwrap();
        assert!(!local.check_association(1, 10).await.unwrap());
    }

    #[tokio::test]
    async fn deleted_individuals_do_not_exist() {
        let (local, _, individuals) = siblings();
        let individual = individuals
            .insert(NewIndividual {
                national_id: "12345".to_string(),
                first_name: "Grace".to_string(),
                last_name: "Hopper".to_string(),
                birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                gender: String::new(),
                email: String::new(),
                phone_number: String::new(),
                address: String::new(),
            })
            .await
            .unwrap();

        assert!(local.check_individual_exists(individual.id).await.unwrap());
        individuals.soft_delete(&individual.id, Utc::now()).await.unwrap();
        assert!(!local.check_individual_exists(individual.id).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_practitioner_is_none() {
        let (local, _, _) = siblings();
        assert_eq!(local.get_practitioner(42).await.unwrap(), None);
    }
}
