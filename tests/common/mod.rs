#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use pergola::{
    BlobStore, Error, MemoryStore, Renderer, Request, Resource, Response, Store, TemplateContext,
};

/// Records every render and returns the template name as the body.
#[derive(Default)]
pub struct RecordingRenderer {
    calls: Mutex<Vec<(String, TemplateContext)>>,
}

impl RecordingRenderer {
    pub fn calls(&self) -> Vec<(String, TemplateContext)> {
        self.calls.lock().clone()
    }

    pub fn last(&self) -> Option<(String, TemplateContext)> {
        self.calls.lock().last().cloned()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&self, template: &str, context: &TemplateContext) -> Result<String, Error> {
        self.calls.lock().push((template.to_owned(), context.clone()));
        Ok(format!("rendered {template}"))
    }
}

/// A [`MemoryStore`] that counts calls.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    pub fetch_all: AtomicUsize,
    pub saves: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl CountingStore {
    pub fn seed(&self, model: &str, fields: &[(&str, &str)]) -> i64 {
        let mut resource = Resource::with_fields(model, fields.iter().copied());
        self.inner.save(&mut resource).unwrap()
    }

    pub fn get(&self, model: &str, id: i64) -> Option<Resource> {
        self.inner.fetch_by_id(model, id).unwrap()
    }

    pub fn count(&self, model: &str) -> usize {
        self.inner.fetch_all(model).unwrap().len()
    }

    pub fn saves(&self) -> usize { self.saves.load(Ordering::SeqCst) }
    pub fn deletes(&self) -> usize { self.deletes.load(Ordering::SeqCst) }
    pub fn fetch_alls(&self) -> usize { self.fetch_all.load(Ordering::SeqCst) }
}

impl Store for CountingStore {
    fn fetch_by_id(&self, model: &str, id: i64) -> Result<Option<Resource>, Error> {
        self.inner.fetch_by_id(model, id)
    }

    fn fetch_all(&self, model: &str) -> Result<Vec<Resource>, Error> {
        self.fetch_all.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_all(model)
    }

    fn save(&self, resource: &mut Resource) -> Result<i64, Error> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(resource)
    }

    fn delete(&self, resource: &Resource) -> Result<(), Error> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(resource)
    }
}

/// Takes the uploaded key from an `x-blob-key` header and streams keys back as text.
#[derive(Default)]
pub struct FakeBlobs {
    pub targets: Mutex<Vec<String>>,
}

impl BlobStore for FakeBlobs {
    fn create_upload_target(&self, redirect_path: &str) -> Result<String, Error> {
        self.targets.lock().push(redirect_path.to_owned());
        Ok(format!("https://blobs.test/upload?next={redirect_path}"))
    }

    fn resolve_uploaded_reference(&self, request: &Request) -> Result<Option<String>, Error> {
        Ok(request.header("x-blob-key").map(str::to_owned))
    }

    fn stream_blob(&self, key: &str) -> Result<Response, Error> {
        Ok(Response::text(format!("blob {key}")))
    }
}

pub fn collaborators() -> (Arc<RecordingRenderer>, Arc<CountingStore>) {
    (Arc::new(RecordingRenderer::default()), Arc::new(CountingStore::default()))
}
