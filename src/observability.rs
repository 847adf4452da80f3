use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("ghmodels.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("ghmodels.client.request_errors");
pub(crate) static CLIENT_REQUEST_RETRIES: Counter = Counter::new("ghmodels.client.retries");
pub(crate) static CLIENT_API_ERRORS: Counter = Counter::new("ghmodels.client.api_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("ghmodels.client.request_duration_seconds");

pub(crate) static STREAM_FRAMES: Counter = Counter::new("ghmodels.stream.frames");
pub(crate) static STREAM_FALLBACK_FRAMES: Counter =
    Counter::new("ghmodels.stream.fallback_frames");
pub(crate) static STREAM_BYTES: Counter = Counter::new("ghmodels.stream.bytes");
pub(crate) static STREAM_CANCELLATIONS: Counter = Counter::new("ghmodels.stream.cancellations");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("ghmodels.stream.errors");
pub(crate) static STREAM_DURATION: Moments = Moments::new("ghmodels.stream.duration_seconds");

pub(crate) static STORE_MUTATIONS: Counter = Counter::new("ghmodels.store.mutations");
pub(crate) static STORE_PERSIST_ERRORS: Counter = Counter::new("ghmodels.store.persist_errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_counter(&CLIENT_REQUEST_RETRIES);
    collector.register_counter(&CLIENT_API_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_FRAMES);
    collector.register_counter(&STREAM_FALLBACK_FRAMES);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_CANCELLATIONS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&STORE_MUTATIONS);
    collector.register_counter(&STORE_PERSIST_ERRORS);
}
