use super::{changed, optional, parse, required, FormField, FormValues, Resource};
use crate::api::types::{
  ListParams, NewVehicle, Page, Vehicle, VehicleStats, VehicleStatus, VehicleType, VehicleUpdate,
};
use crate::api::{ApiClient, ApiError};
use crate::mutation::Mutation;
use crate::table::{Cell, CellRender, ColumnDescriptor, FieldValue, Row, RowAction, Tone};
use futures::future::{BoxFuture, FutureExt};

impl Row for Vehicle {
  fn field(&self, key: &str) -> Option<FieldValue> {
    match key {
      "id" => Some(self.id.as_str().into()),
      "make" => Some(self.make.as_str().into()),
      "model" => Some(self.model.as_str().into()),
      "year" => Some(i64::from(self.year).into()),
      "license_plate" => Some(self.license_plate.as_str().into()),
      "vehicle_type" => Some(self.vehicle_type.as_str().into()),
      "status" => Some(self.status.as_str().into()),
      "daily_rate" => Some(self.daily_rate.into()),
      "location" => self.location.as_deref().map(FieldValue::from),
      "created_at" => Some(self.created_at.into()),
      _ => None,
    }
  }

  fn row_key(&self) -> String {
    self.id.clone()
  }
}

pub fn vehicle_tone(status: &str) -> Tone {
  match status {
    "available" => Tone::Good,
    "rented" => Tone::Accent,
    "maintenance" => Tone::Warning,
    "retired" => Tone::Muted,
    _ => Tone::Normal,
  }
}

fn make_model(_value: Option<&FieldValue>, vehicle: &Vehicle) -> Cell {
  Cell::new(format!("{} {}", vehicle.make, vehicle.model))
}

fn actions(_vehicle: &Vehicle) -> Vec<RowAction> {
  vec![RowAction::Edit, RowAction::ChangeStatus, RowAction::Delete]
}

impl Resource for Vehicle {
  type Stats = VehicleStats;

  const NAME: &'static str = "vehicles";
  const STATS: &'static str = "vehicle-stats";
  const TITLE: &'static str = "Vehicles";
  const EMPTY_MESSAGE: &'static str = "No vehicles in the fleet.";

  fn columns() -> Vec<ColumnDescriptor<Self>> {
    vec![
      ColumnDescriptor::field("license_plate", "Plate", 10),
      ColumnDescriptor::field("make", "Vehicle", 20).with_render(CellRender::Custom(make_model)),
      ColumnDescriptor::field("year", "Year", 4),
      ColumnDescriptor::field("vehicle_type", "Type", 10),
      ColumnDescriptor::field("status", "Status", 11).with_render(CellRender::Badge(vehicle_tone)),
      ColumnDescriptor::field("daily_rate", "Daily", 9).with_render(CellRender::Money),
      ColumnDescriptor::field("location", "Location", 10),
      ColumnDescriptor::actions(actions, 24),
    ]
  }

  fn fetch_page(
    api: ApiClient,
    params: ListParams,
  ) -> BoxFuture<'static, Result<Page<Self>, ApiError>> {
    async move { api.list_vehicles(&params).await }.boxed()
  }

  fn fetch_one(api: ApiClient, id: String) -> BoxFuture<'static, Result<Self, ApiError>> {
    async move { api.get_vehicle(&id).await }.boxed()
  }

  fn fetch_stats(api: ApiClient) -> BoxFuture<'static, Result<Self::Stats, ApiError>> {
    async move { api.vehicle_stats().await }.boxed()
  }

  fn stats_line(stats: &VehicleStats) -> String {
    format!(
      "total {}  available {}  rented {}  maintenance {}  retired {}",
      stats.total, stats.available, stats.rented, stats.maintenance, stats.retired
    )
  }

  fn row_actions(vehicle: &Self) -> Vec<RowAction> {
    actions(vehicle)
  }

  fn action_mutation(vehicle: &Self, action: RowAction) -> Option<Mutation> {
    match action {
      RowAction::Delete => Some(Mutation::DeleteVehicle {
        id: vehicle.id.clone(),
      }),
      _ => None,
    }
  }

  fn status_choices(vehicle: &Self) -> Vec<&'static str> {
    VehicleStatus::ALL
      .iter()
      .filter(|s| **s != vehicle.status)
      .map(|s| s.as_str())
      .collect()
  }

  fn status_mutation(vehicle: &Self, choice: &str) -> Result<Mutation, String> {
    let status: VehicleStatus = choice.parse()?;
    Ok(Mutation::SetVehicleStatus {
      id: vehicle.id.clone(),
      status,
    })
  }

  fn create_form() -> Option<Vec<FormField>> {
    Some(vec![
      FormField::new("make", "Make", ""),
      FormField::new("model", "Model", ""),
      FormField::new("year", "Year", ""),
      FormField::new("license_plate", "Plate", ""),
      FormField::new("vehicle_type", "Type", VehicleType::Car.as_str()),
      FormField::new("daily_rate", "Daily rate", ""),
      FormField::new("location", "Location", ""),
    ])
  }

  fn build_create(values: &FormValues) -> Result<Mutation, String> {
    Ok(Mutation::CreateVehicle(NewVehicle {
      make: required(values, "make")?,
      model: required(values, "model")?,
      year: parse(values, "year")?,
      license_plate: required(values, "license_plate")?,
      vehicle_type: parse(values, "vehicle_type")?,
      daily_rate: parse(values, "daily_rate")?,
      location: optional(values, "location"),
    }))
  }

  fn edit_form(vehicle: &Self) -> Option<Vec<FormField>> {
    Some(vec![
      FormField::new("make", "Make", vehicle.make.clone()),
      FormField::new("model", "Model", vehicle.model.clone()),
      FormField::new("year", "Year", vehicle.year.to_string()),
      FormField::new("license_plate", "Plate", vehicle.license_plate.clone()),
      FormField::new("daily_rate", "Daily rate", format!("{:.2}", vehicle.daily_rate)),
      FormField::new(
        "location",
        "Location",
        vehicle.location.clone().unwrap_or_default(),
      ),
    ])
  }

  fn build_edit(vehicle: &Self, values: &FormValues) -> Result<Mutation, String> {
    let daily_rate: f64 = parse(values, "daily_rate")?;
    let update = VehicleUpdate {
      make: changed(required(values, "make")?, &vehicle.make),
      model: changed(required(values, "model")?, &vehicle.model),
      year: changed(parse(values, "year")?, &vehicle.year),
      license_plate: changed(required(values, "license_plate")?, &vehicle.license_plate),
      // the form shows two decimals
      daily_rate: ((daily_rate - vehicle.daily_rate).abs() >= 0.005).then_some(daily_rate),
      location: optional(values, "location")
        .and_then(|l| changed(Some(l), &vehicle.location).flatten()),
    };
    Ok(Mutation::UpdateVehicle {
      id: vehicle.id.clone(),
      update,
    })
  }

  fn detail(vehicle: &Self) -> Vec<(&'static str, String)> {
    vec![
      ("ID", vehicle.id.clone()),
      ("Vehicle", format!("{} {} ({})", vehicle.make, vehicle.model, vehicle.year)),
      ("Plate", vehicle.license_plate.clone()),
      ("Type", vehicle.vehicle_type.to_string()),
      ("Status", vehicle.status.to_string()),
      ("Daily rate", format!("${:.2}", vehicle.daily_rate)),
      (
        "Location",
        vehicle.location.clone().unwrap_or_else(|| "-".to_string()),
      ),
      ("Added", vehicle.created_at.format("%Y-%m-%d %H:%M").to_string()),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  fn vehicle() -> Vehicle {
    Vehicle {
      id: "veh-0013".to_string(),
      make: "Ford".to_string(),
      model: "Transit".to_string(),
      year: 2020,
      license_plate: "12-AB-34".to_string(),
      vehicle_type: VehicleType::Van,
      status: VehicleStatus::Rented,
      daily_rate: 89.9,
      location: Some("Porto".to_string()),
      created_at: Utc::now(),
    }
  }

  #[test]
  fn test_columns_render_vehicle() {
    let v = vehicle();
    let cells: Vec<_> = Vehicle::columns().iter().map(|c| c.cell(&v)).collect();
    assert_eq!(cells[0].text, "12-AB-34");
    assert_eq!(cells[1].text, "Ford Transit");
    assert_eq!(cells[2].text, "2020");
    assert_eq!(cells[4], Cell::toned("rented", Tone::Accent));
    assert_eq!(cells[5].text, "$89.90");
    assert_eq!(cells[6].text, "Porto");
  }

  #[test]
  fn test_status_choices_exclude_current() {
    let choices = Vehicle::status_choices(&vehicle());
    assert_eq!(choices, vec!["available", "maintenance", "retired"]);
    assert_eq!(
      Vehicle::status_mutation(&vehicle(), "maintenance"),
      Ok(Mutation::SetVehicleStatus {
        id: "veh-0013".to_string(),
        status: VehicleStatus::Maintenance,
      })
    );
    assert!(Vehicle::status_mutation(&vehicle(), "scrapped").is_err());
  }

  #[test]
  fn test_edit_round_trip_is_a_no_op() {
    let v = vehicle();
    let values: FormValues = Vehicle::edit_form(&v)
      .unwrap()
      .into_iter()
      .map(|f| (f.name, f.value))
      .collect();
    let Mutation::UpdateVehicle { update, .. } = Vehicle::build_edit(&v, &values).unwrap() else {
      panic!("expected an update");
    };
    assert_eq!(update, VehicleUpdate::default());
  }

  #[test]
  fn test_create_parses_numbers() {
    let mut values: FormValues = Vehicle::create_form()
      .unwrap()
      .into_iter()
      .map(|f| (f.name, f.value))
      .collect();
    values.insert("make", "Vespa".to_string());
    values.insert("model", "GTS".to_string());
    values.insert("license_plate", "AA-11-BB".to_string());
    values.insert("year", "2023".to_string());
    values.insert("daily_rate", "24.5".to_string());
    values.insert("vehicle_type", "scooter".to_string());

    let Mutation::CreateVehicle(new) = Vehicle::build_create(&values).unwrap() else {
      panic!("expected a create");
    };
    assert_eq!(new.year, 2023);
    assert_eq!(new.vehicle_type, VehicleType::Scooter);
    assert_eq!(new.location, None);

    values.insert("daily_rate", "cheap".to_string());
    assert!(Vehicle::build_create(&values)
      .unwrap_err()
      .starts_with("daily_rate:"));
  }
}
