mod dashboard;
mod detail;
mod health;
mod resource_list;

pub use dashboard::DashboardView;
pub use detail::DetailView;
pub use health::HealthView;
pub use resource_list::ResourceListView;

use crate::api::types::{Booking, Notification, Page, User, Vehicle};
use crate::api::ApiClient;
use crate::cache::{QueryCache, QueryKey};
use crate::config::Config;
use crate::mutation::MutationExecutor;
use crate::query::CachedQuery;
use crate::resources::Resource;
use crate::ui::view::View;
use futures::FutureExt;
use std::sync::Arc;

/// Everything a view needs to talk to the backend.
#[derive(Clone)]
pub struct ViewContext {
  pub api: ApiClient,
  pub cache: QueryCache,
  pub executor: MutationExecutor,
  pub config: Arc<Config>,
}

impl ViewContext {
  pub fn new(api: ApiClient, cache: QueryCache, config: Config) -> Self {
    let executor = MutationExecutor::new(api.clone(), cache.clone());
    Self {
      api,
      cache,
      executor,
      config: Arc::new(config),
    }
  }

  /// Rows per page for a resource list
  pub fn page_size(&self, resource: &str) -> u32 {
    match resource {
      "bookings" => self.config.views.bookings_page_size,
      _ => self.config.views.page_size,
    }
  }
}

/// Root view for a palette command; `None` for commands that are not views.
pub fn root_view(command: &str, ctx: &ViewContext) -> Option<Box<dyn View>> {
  let view: Box<dyn View> = match command {
    "dashboard" => Box::new(DashboardView::new(ctx.clone())),
    "users" => Box::new(ResourceListView::<User>::new(ctx.clone())),
    "vehicles" => Box::new(ResourceListView::<Vehicle>::new(ctx.clone())),
    "bookings" => Box::new(ResourceListView::<Booking>::new(ctx.clone())),
    "notifications" => Box::new(ResourceListView::<Notification>::new(ctx.clone())),
    "health" => Box::new(HealthView::new(ctx.clone())),
    _ => return None,
  };
  Some(view)
}

/// Observe the stats record of `R`, starting the first load.
fn stats_query<R: Resource>(ctx: &ViewContext) -> CachedQuery<R::Stats> {
  let api = ctx.api.clone();
  let mut query = CachedQuery::new(&ctx.cache, QueryKey::resource(R::STATS), move || {
    R::fetch_stats(api.clone()).map(|result| result.map(Page::single))
  });
  query.fetch();
  query
}
