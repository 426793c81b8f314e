use super::ViewContext;
use crate::api::types::{HealthStatus, ServiceHealth};
use crate::api::ApiClient;
use crate::query::Query;
use crate::ui::renderfns::state_suffix;
use crate::ui::view::{View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use futures::future::join_all;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use std::time::Duration;

/// Gateway status plus one entry per configured service
#[derive(Debug, Clone)]
pub struct HealthReport {
  pub gateway: HealthStatus,
  pub services: Vec<ServiceHealth>,
}

const UNREACHABLE: &str = "unreachable";

async fn check(api: ApiClient, services: Vec<String>) -> HealthReport {
  let gateway = api.health().await.unwrap_or_else(|err| HealthStatus {
    status: format!("{}: {}", UNREACHABLE, err),
    version: None,
    timestamp: None,
  });

  let checks = services.into_iter().map(|service| {
    let api = api.clone();
    async move {
      match api.service_health(&service).await {
        Ok(health) => health,
        Err(err) => ServiceHealth {
          service,
          status: UNREACHABLE.to_string(),
          latency_ms: None,
          message: Some(err.to_string()),
        },
      }
    }
  });

  HealthReport {
    gateway,
    services: join_all(checks).await,
  }
}

fn status_color(status: &str) -> Color {
  match status {
    "ok" | "healthy" | "up" => Color::Green,
    "degraded" => Color::Yellow,
    _ => Color::Red,
  }
}

/// Polls the gateway and each service on a fixed interval.
pub struct HealthView {
  query: Query<HealthReport>,
}

impl HealthView {
  pub fn new(ctx: ViewContext) -> Self {
    let api = ctx.api.clone();
    let services = ctx.config.health.services.clone();
    let refresh = Duration::from_secs(ctx.config.health.refresh_secs);
    let mut query = Query::new(move || {
      let api = api.clone();
      let services = services.clone();
      async move { Ok(check(api, services).await) }
    })
    .with_stale_time(refresh);
    query.fetch();
    Self { query }
  }

  fn rows(report: &HealthReport) -> Vec<Row<'static>> {
    report
      .services
      .iter()
      .map(|service| {
        let latency = service
          .latency_ms
          .map(|ms| format!("{} ms", ms))
          .unwrap_or_else(|| "-".to_string());
        Row::new(vec![
          Cell::from(service.service.clone()),
          Cell::from(service.status.clone())
            .style(Style::default().fg(status_color(&service.status))),
          Cell::from(latency),
          Cell::from(service.message.clone().unwrap_or_default()),
        ])
      })
      .collect()
  }
}

impl View for HealthView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(3), Constraint::Min(3)])
      .split(area);

    let error = self.query.error().map(|e| e.to_string());
    let suffix = state_suffix(self.query.is_loading(), error.as_deref());

    let gateway = match self.query.data() {
      Some(report) => {
        let version = report.gateway.version.as_deref().unwrap_or("-");
        Line::from(vec![
          Span::raw(" gateway "),
          Span::styled(
            report.gateway.status.clone(),
            Style::default().fg(status_color(&report.gateway.status)).bold(),
          ),
          Span::styled(format!("  version {}", version), Style::default().fg(Color::Gray)),
        ])
      }
      None => Line::from(Span::styled(" checking...", Style::default().fg(Color::DarkGray))),
    };
    let block = Block::default()
      .title(format!(" Health{} ", suffix))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    frame.render_widget(Paragraph::new(gateway).block(block), chunks[0]);

    let rows = self.query.data().map(Self::rows).unwrap_or_default();
    let header = Row::new(vec!["Service", "Status", "Latency", "Message"])
      .style(Style::default().fg(Color::Yellow).bold());
    let table = Table::new(
      rows,
      [
        Constraint::Length(16),
        Constraint::Length(14),
        Constraint::Length(10),
        Constraint::Min(20),
      ],
    )
    .header(header)
    .block(
      Block::default()
        .title(" Services ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue)),
    );
    frame.render_widget(table, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    "Health".to_string()
  }

  fn context(&self) -> Option<String> {
    let at = self.query.data()?.gateway.timestamp?;
    Some(format!("checked {}", at.format("%H:%M:%S")))
  }

  fn tick(&mut self) {
    self.query.poll();
    self.query.refetch_if_stale();
  }
}
