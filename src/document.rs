// Where the location of the documents is kept. The resolver never touches it,
// `georeference_document` is the create/update handler gluing both together.

use crate::resolver::{GeoreferenceResolver, GeoreferenceUpdate};
use crate::zone_catalog::{StoreError, ZoneStore};
use crate::GeoreferenceError;
use georef_model::{Coord, GeoreferenceInput, GeoreferenceRequest, GeoreferenceResult, ZoneId};
use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::sync::RwLock;

pub type DocumentId = u64;

pub trait DocumentGeoStore {
    fn persist(&self, document: DocumentId, result: GeoreferenceResult) -> Result<(), StoreError>;

    fn previous_result(&self, document: DocumentId) -> Result<Option<GeoreferenceResult>, StoreError>;

    fn documents_in_zone(&self, zone: ZoneId) -> Result<Vec<DocumentId>, StoreError>;

    /// the point displayed on the map for a document
    fn location(&self, document: DocumentId) -> Result<Option<Coord>, StoreError> {
        Ok(self.previous_result(document)?.map(|r| r.point()))
    }
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<BTreeMap<DocumentId, GeoreferenceResult>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("the document table is poisoned".into())
}

impl DocumentGeoStore for MemoryDocumentStore {
    fn persist(&self, document: DocumentId, result: GeoreferenceResult) -> Result<(), StoreError> {
        self.documents.write().map_err(poisoned)?.insert(document, result);
        Ok(())
    }

    fn previous_result(&self, document: DocumentId) -> Result<Option<GeoreferenceResult>, StoreError> {
        Ok(self.documents.read().map_err(poisoned)?.get(&document).cloned())
    }

    fn documents_in_zone(&self, zone: ZoneId) -> Result<Vec<DocumentId>, StoreError> {
        Ok(self
            .documents
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|(_, r)| r.zone_id == Some(zone))
            .map(|(d, _)| *d)
            .collect())
    }
}

/// What happened to a document's location
#[derive(Debug, Clone, PartialEq)]
pub struct Georeferencing {
    pub result: GeoreferenceResult,
    /// the drawn zone the document left and that no document uses anymore.
    /// Removing it is up to the caller.
    pub orphaned_zone: Option<ZoneId>,
}

/// Create or update the location of a document.
///
/// On error the stored location of the document is left untouched.
pub fn georeference_document<S, D>(
    resolver: &GeoreferenceResolver<S>,
    documents: &D,
    document: DocumentId,
    request: GeoreferenceRequest,
) -> Result<Georeferencing, GeoreferenceError>
where
    S: ZoneStore,
    D: DocumentGeoStore,
{
    let input = GeoreferenceInput::try_from(request)?;
    let previous = documents.previous_result(document)?;
    let GeoreferenceUpdate {
        result,
        released_zone,
    } = resolver.resolve_update(previous.as_ref(), input)?;
    documents.persist(document, result)?;

    let orphaned_zone = match released_zone {
        Some(zone) if documents.documents_in_zone(zone)?.is_empty() => {
            info!("document {} left zone {}, no document uses it anymore", document, zone);
            Some(zone)
        }
        _ => None,
    };
    Ok(Georeferencing {
        result,
        orphaned_zone,
    })
}
