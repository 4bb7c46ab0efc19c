use std::sync::Arc;

use cucumber::World;
use offgrid_backend::MemoryKeyValueStore;
use offgrid_configuration::RuntimeConfig;
use offgrid_core::{ManualClock, Origin};
use offgrid_page::{Connectivity, PageConfig, PageContext, PageContextBuilder};

use crate::mock::{MockProbe, MockSink};

pub const ORIGIN: &str = "https://devcommunity.cn";

pub type TestPage = PageContext<MemoryKeyValueStore, Arc<MockSink>, Arc<MockProbe>>;

#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct PageWorld {
    pub path: String,
    pub store: MemoryKeyValueStore,
    pub sink: Arc<MockSink>,
    pub probe: Arc<MockProbe>,
    pub clock: ManualClock,
    pub connectivity: Connectivity,
    page: Option<TestPage>,
    pub last_count: usize,
    pub last_flag: Option<bool>,
    pub validations: Vec<bool>,
    pub runtime: Option<RuntimeConfig>,
    pub config_error: Option<String>,
}

impl PageWorld {
    pub fn new() -> Self {
        Self {
            path: "/".to_owned(),
            store: MemoryKeyValueStore::new(),
            sink: Arc::new(MockSink::default()),
            probe: Arc::new(MockProbe::default()),
            clock: ManualClock::default(),
            connectivity: Connectivity::new(true),
            page: None,
            last_count: 0,
            last_flag: None,
            validations: Vec::new(),
            runtime: None,
            config_error: None,
        }
    }

    /// The page, built at the configured path on first use.
    pub fn page(&mut self) -> &mut TestPage {
        let path = self.path.clone();
        let store = self.store.clone();
        let sink = self.sink.clone();
        let probe = self.probe.clone();
        let clock = Arc::new(self.clock.clone());
        let connectivity = self.connectivity.clone();
        self.page.get_or_insert_with(|| {
            let config = PageConfig::builder(Origin::parse(ORIGIN).unwrap())
                .build()
                .unwrap();
            PageContextBuilder::new(config, path)
                .clock(clock)
                .connectivity(connectivity)
                .build(store, sink, probe)
        })
    }
}
