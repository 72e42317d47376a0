//! SimulationEngine - rule registry, request matching and the store it drives.
//!
//! Rules and the store share one lock so a match, its store mutation and the
//! repeat decrement happen atomically with respect to other requests.

use super::body_params;
use super::request::RequestDescriptor;
use super::types::{Condition, ContentKind, Persistence, Simulation};
use crate::constraint::{self, EvaluatedConstraint};
use crate::document;
use crate::imdb::{Entry, Imdb, StoreError};
use crate::route::{self, RouteToken};
use crate::template::{self, Variables};
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Invalid JSON document: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Stored documents must be JSON objects")]
    NotAnObject,
}

/// Everything a matched rule needs to render its response.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Snapshot of the rule after its repeat count was decremented.
    pub simulation: Simulation,
    pub tokens: Vec<RouteToken>,
    pub matched_constraints: Vec<EvaluatedConstraint>,
    pub violated_constraints: Vec<EvaluatedConstraint>,
    pub variables: Variables,
    /// Entry added, removed or looked up by identity.
    pub record: Option<Entry>,
    /// Entries of the addressed resource for collection reads.
    pub listing: Option<Vec<Entry>>,
}

#[derive(Debug, Default)]
struct EngineState {
    simulations: Vec<Simulation>,
    store: Imdb,
}

/// Request body decoded once per request for every candidate rule.
struct ParsedBody {
    json: Option<Value>,
    form: Option<Value>,
}

impl ParsedBody {
    fn new(request: &RequestDescriptor) -> Self {
        Self {
            json: request.json_body(),
            form: (!request.body().is_empty())
                .then(|| body_params::body_params_to_json(&request.body_text())),
        }
    }

    fn document(&self, content: ContentKind) -> Option<&Value> {
        match content {
            ContentKind::Json => self.json.as_ref(),
            ContentKind::BodyParameters => self.form.as_ref(),
            ContentKind::Binary | ContentKind::Text => None,
        }
    }
}

/// A rule that passed every check, with what was learned while checking it.
struct Candidate {
    index: usize,
    tokens: Vec<RouteToken>,
    satisfied: Vec<EvaluatedConstraint>,
    violated: Vec<EvaluatedConstraint>,
    identity: Option<String>,
    discriminator: Option<String>,
    existing: Option<Entry>,
}

#[derive(Debug, Default)]
pub struct SimulationEngine {
    state: Mutex<EngineState>,
}

impl SimulationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule. Returns false if a rule with the same name
    /// (case-insensitive) already exists.
    pub fn register(&self, simulation: Simulation) -> bool {
        let mut state = self.state.lock();
        if state
            .simulations
            .iter()
            .any(|existing| existing.name.eq_ignore_ascii_case(&simulation.name))
        {
            warn!("Simulation '{}' is already registered", simulation.name);
            return false;
        }

        info!(
            "Registered simulation '{}' ({} {})",
            simulation.name, simulation.condition.method, simulation.condition.pattern
        );
        state.simulations.push(simulation);
        true
    }

    /// Delete a rule by name, or every rule with `"*"`.
    ///
    /// `purge_data` also clears the rule's stored data (everything for `"*"`);
    /// `retain_simulation` keeps the rule registered, which together with
    /// `purge_data` resets its data only.
    pub fn delete(&self, name: &str, purge_data: bool, retain_simulation: bool) -> bool {
        let mut state = self.state.lock();

        if name == "*" {
            if purge_data {
                state.store.remove_all();
            }
            if !retain_simulation {
                state.simulations.clear();
            }
            info!(
                "Deleted all simulations (purge_data={}, retain_simulation={})",
                purge_data, retain_simulation
            );
            return true;
        }

        let Some(index) = state
            .simulations
            .iter()
            .position(|existing| existing.name.eq_ignore_ascii_case(name))
        else {
            debug!("Simulation '{}' not found", name);
            return false;
        };

        if purge_data {
            let pattern = state.simulations[index].condition.pattern.clone();
            let purged = state.store.purge_pattern(&pattern);
            debug!("Purged data for pattern '{}' in {} partition(s)", pattern, purged);
        }
        if !retain_simulation {
            state.simulations.remove(index);
        }
        info!("Simulation '{}' deleted", name);
        true
    }

    /// Registered rules in match order.
    pub fn simulations(&self) -> Vec<Simulation> {
        self.state.lock().simulations.clone()
    }

    pub fn simulation(&self, name: &str) -> Option<Simulation> {
        self.state
            .lock()
            .simulations
            .iter()
            .find(|existing| existing.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Find the first rule matching `request` and apply its store effects.
    ///
    /// With `decrement_on_match` the rule's repeat count is decremented after
    /// the store mutation succeeds and the rule is removed once it reaches
    /// zero. A failed mutation leaves both the store and the count untouched.
    pub fn match_request(
        &self,
        request: &RequestDescriptor,
        decrement_on_match: bool,
    ) -> Result<Option<MatchResult>, EngineError> {
        let body = ParsedBody::new(request);
        let mut guard = self.state.lock();
        let EngineState { simulations, store } = &mut *guard;

        let candidate = {
            let store: &Imdb = store;
            simulations
                .iter()
                .enumerate()
                .find_map(|(index, simulation)| admit(index, simulation, store, request, &body))
        };
        let Some(candidate) = candidate else {
            debug!("No simulation matched {} {}", request.method(), request.path());
            return Ok(None);
        };

        let simulation = &simulations[candidate.index];
        debug!(
            "Matched simulation '{}' for {} {}",
            simulation.name,
            request.method(),
            request.path()
        );

        let mut variables = request_variables(request, &candidate, body.document(simulation.condition.content));
        let (record, listing) = apply_store_effects(store, simulation, request, &candidate, &variables)?;
        add_result_variables(&mut variables, simulation, &candidate, record.as_ref(), listing.as_deref());

        let mut matched = simulation.clone();
        if decrement_on_match {
            if let Some(remaining) = simulations[candidate.index].condition.repeat.as_mut() {
                *remaining = remaining.saturating_sub(1);
                matched.condition.repeat = Some(*remaining);
                if *remaining == 0 {
                    simulations.remove(candidate.index);
                    info!("Simulation '{}' exhausted its repeat count and was removed", matched.name);
                }
            }
        }

        let Candidate {
            tokens,
            satisfied,
            violated,
            ..
        } = candidate;

        Ok(Some(MatchResult {
            simulation: matched,
            tokens,
            matched_constraints: satisfied,
            violated_constraints: violated,
            variables,
            record,
            listing,
        }))
    }

    /// Add a document to the store outside of rule matching.
    pub fn add_to_store(
        &self,
        path: &str,
        pattern: &str,
        key_property: Option<&str>,
        json: &str,
        binary: Option<Bytes>,
        discriminator: Option<&str>,
    ) -> Result<(), StoreError> {
        self.state
            .lock()
            .store
            .add_json(path, pattern, key_property, json, binary, discriminator)
    }

    /// Remove one entry by identity, or the whole addressed resource when no
    /// key property is given.
    pub fn delete_from_store(
        &self,
        path: &str,
        pattern: &str,
        key_property: Option<&str>,
        value: Option<&str>,
        discriminator: Option<&str>,
    ) -> bool {
        let mut state = self.state.lock();
        match key_property {
            Some(key) => state.store.remove(path, pattern, key, value, discriminator),
            None => state.store.remove_resource(path, pattern, discriminator),
        }
    }

    pub fn get_as_json(
        &self,
        path: &str,
        pattern: &str,
        key_property: &str,
        value: Option<&str>,
        discriminator: Option<&str>,
    ) -> Option<String> {
        self.state
            .lock()
            .store
            .lookup(path, pattern, key_property, value, discriminator)
            .map(|entry| entry.json().to_string())
    }

    /// The entry's binary payload as text, falling back to its JSON.
    pub fn get_as_text(
        &self,
        path: &str,
        pattern: &str,
        key_property: &str,
        value: Option<&str>,
        discriminator: Option<&str>,
    ) -> Option<String> {
        self.state
            .lock()
            .store
            .lookup(path, pattern, key_property, value, discriminator)
            .map(|entry| match entry.binary() {
                Some(binary) => String::from_utf8_lossy(binary).into_owned(),
                None => entry.json().to_string(),
            })
    }

    pub fn get_binary(
        &self,
        path: &str,
        pattern: &str,
        key_property: &str,
        value: Option<&str>,
        discriminator: Option<&str>,
    ) -> Option<Bytes> {
        self.state
            .lock()
            .store
            .lookup(path, pattern, key_property, value, discriminator)
            .and_then(|entry| entry.binary().cloned())
    }

    /// Documents stored directly at the addressed resource.
    pub fn get_resource(&self, path: &str, pattern: &str, discriminator: Option<&str>) -> Option<Vec<Value>> {
        self.state
            .lock()
            .store
            .lookup_resource(path, pattern, discriminator)
            .map(|resource| {
                resource
                    .entries()
                    .iter()
                    .map(|entry| entry.document().clone())
                    .collect()
            })
    }

    pub fn clear_store(&self) {
        self.state.lock().store.remove_all();
        info!("Store cleared");
    }

    pub fn body_params_to_json(text: &str) -> Value {
        body_params::body_params_to_json(text)
    }

    /// Convert JSON text to body parameters.
    pub fn json_to_body_params(json: &str, url_encode: bool) -> Result<String, EngineError> {
        let document: Value = serde_json::from_str(json)?;
        Ok(body_params::json_to_body_params(&document, url_encode))
    }
}

/// Run every check of one rule against the request, in order: method, route,
/// query and headers, constraints, then the persistence policy.
fn admit(
    index: usize,
    simulation: &Simulation,
    store: &Imdb,
    request: &RequestDescriptor,
    body: &ParsedBody,
) -> Option<Candidate> {
    let condition = &simulation.condition;
    if simulation.is_expired() || !condition.method.eq_ignore_ascii_case(request.method()) {
        return None;
    }
    let tokens = route::tokenize(request.path(), &condition.pattern)?;
    if !query_matches(condition, request) || !headers_match(condition, request) {
        return None;
    }

    let document = body.document(condition.content);
    let (satisfied, violated) = if request.carries_body() && !condition.constraints.is_empty() {
        constraint::evaluate_all(&condition.constraints, document)
    } else {
        (Vec::new(), Vec::new())
    };
    if !violated.is_empty() && !condition.match_on_violations {
        debug!(
            "Simulation '{}' skipped: {} constraint(s) violated",
            simulation.name,
            violated.len()
        );
        return None;
    }

    let discriminator = condition
        .discriminator_header
        .as_deref()
        .and_then(|header| request.header(header))
        .map(str::to_string);

    let key = condition.key_property.as_deref();
    let identity = key.and_then(|key| {
        route_identity(&tokens, key)
            .map(str::to_string)
            .or_else(|| document.and_then(|doc| document::property_string(doc, key)))
    });
    let existing = key.and_then(|key| {
        store
            .lookup_entry(&tokens, key, identity.as_deref(), discriminator.as_deref())
            .cloned()
    });

    let admitted = match (condition.persistence, key) {
        (Persistence::None, _) | (_, None) => true,
        (Persistence::Exists, Some(_)) => existing.is_some(),
        (Persistence::NotExists, Some(_)) => existing.is_none(),
    };
    if !admitted {
        debug!(
            "Simulation '{}' skipped: persistence {:?} not satisfied for {:?}",
            simulation.name, condition.persistence, identity
        );
        return None;
    }

    Some(Candidate {
        index,
        tokens,
        satisfied,
        violated,
        identity,
        discriminator,
        existing,
    })
}

fn query_matches(condition: &Condition, request: &RequestDescriptor) -> bool {
    condition.query.iter().all(|(name, expected)| {
        request
            .query_value(name)
            .is_some_and(|actual| expected == "*" || actual == expected)
    })
}

fn headers_match(condition: &Condition, request: &RequestDescriptor) -> bool {
    condition.headers.iter().all(|(name, expected)| {
        request
            .header(name)
            .is_some_and(|actual| expected == "*" || actual == expected)
    })
}

/// Identity captured by the terminal route segment.
fn route_identity<'a>(tokens: &'a [RouteToken], key_property: &str) -> Option<&'a str> {
    tokens
        .last()
        .filter(|token| token.is_property_named(key_property))
        .and_then(RouteToken::value)
}

fn apply_store_effects(
    store: &mut Imdb,
    simulation: &Simulation,
    request: &RequestDescriptor,
    candidate: &Candidate,
    variables: &Variables,
) -> Result<(Option<Entry>, Option<Vec<Entry>>), EngineError> {
    let key = simulation.condition.key_property.as_deref();
    let partition = candidate.discriminator.as_deref();

    if simulation.response.add_to_store {
        let entry = build_entry(simulation, request, candidate, variables)?;
        store.add_entry(&candidate.tokens, key, entry.clone(), partition);
        return Ok((Some(entry), None));
    }

    if simulation.response.remove_from_store {
        let removed = match key {
            Some(key) => store.remove_entry(&candidate.tokens, key, candidate.identity.as_deref(), partition),
            None => {
                store.remove_resource_at(&candidate.tokens, partition);
                None
            }
        };
        return Ok((removed, None));
    }

    if candidate.identity.is_some() {
        return Ok((candidate.existing.clone(), None));
    }
    let listing = store
        .resource_at(&candidate.tokens, partition)
        .map(|resource| resource.entries().to_vec());
    Ok((None, listing))
}

/// Build the entry a rule stores: the decoded body, the route identity, then
/// the rule's overrides.
fn build_entry(
    simulation: &Simulation,
    request: &RequestDescriptor,
    candidate: &Candidate,
    variables: &Variables,
) -> Result<Entry, EngineError> {
    let condition = &simulation.condition;
    let (mut doc, binary) = match condition.content {
        ContentKind::Json => (
            serde_json::from_slice::<Value>(request.body()).map_err(StoreError::from)?,
            None,
        ),
        ContentKind::BodyParameters => (body_params::body_params_to_json(&request.body_text()), None),
        ContentKind::Binary | ContentKind::Text => {
            let captured = route::captures(&candidate.tokens)
                .into_iter()
                .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
                .collect();
            (Value::Object(captured), Some(request.body().clone()))
        }
    };

    let keyed = condition.key_property.is_some() || !simulation.response.overrides.is_empty();
    if keyed && !(doc.is_object() || doc.is_null()) {
        return Err(EngineError::NotAnObject);
    }

    // Route identity wins over the body
    if let Some(key) = condition.key_property.as_deref() {
        if let Some(identity) = route_identity(&candidate.tokens, key) {
            document::set_property(&mut doc, key, Value::String(identity.to_string()));
        }
    }

    for (name, value) in &simulation.response.overrides {
        let value = match value {
            Value::String(template) => Value::String(template::substitute(template, variables)),
            other => other.clone(),
        };
        document::set_property(&mut doc, name, value);
    }

    Ok(Entry::from_document(doc, binary))
}

/// Variables available before the store is touched. Later sources shadow
/// earlier ones: query, then body properties, then route captures.
fn request_variables(request: &RequestDescriptor, candidate: &Candidate, document: Option<&Value>) -> Variables {
    let mut vars = Variables::new();
    for (name, value) in request.query() {
        vars.insert(name, value);
        vars.insert(format!("Query:{name}"), value);
    }
    if let Some(doc) = document {
        for (name, value) in document::scalar_properties(doc) {
            vars.insert(name, value);
        }
    }
    for (name, value) in route::captures(&candidate.tokens) {
        vars.insert(name, value);
    }
    for (name, value) in request.headers() {
        vars.insert(format!("Header:{name}"), value);
    }
    vars.insert("Request:Method", request.method());
    vars.insert("Request:Path", request.path());
    vars.insert("Request:Body", request.body_text());
    vars
}

fn add_result_variables(
    vars: &mut Variables,
    simulation: &Simulation,
    candidate: &Candidate,
    record: Option<&Entry>,
    listing: Option<&[Entry]>,
) {
    if let Some(record) = record {
        vars.insert("Store:Record", record.json());
        for (name, value) in document::scalar_properties(record.document()) {
            if !vars.contains(&name) {
                vars.insert(name, value);
            }
        }
    }
    if let Some(listing) = listing {
        let documents: Vec<Value> = listing.iter().map(|entry| entry.document().clone()).collect();
        vars.insert("Store:Records", Value::Array(documents).to_string());
    }
    vars.insert("Constraints:Satisfied", states_json(&candidate.satisfied));
    vars.insert("Constraints:Violated", states_json(&candidate.violated));
    vars.insert("Simulation:Name", simulation.name.as_str());
}

fn states_json(evaluated: &[EvaluatedConstraint]) -> String {
    Value::Array(
        evaluated
            .iter()
            .map(|e| Value::String(e.state.clone()))
            .collect(),
    )
    .to_string()
}
