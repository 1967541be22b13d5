//! Typed helpers for the lighting endpoints exposed by a device.
//!
//! Devices expose their metadata at [`INFO`] and their lighting state at
//! [`STATE`]. State is a JSON object where every property is wrapped in
//! `{"value": ...}`, e.g. `{"on":{"value":true},"brightness":{"value":40}}`.
//! A PUT to [`STATE`] only changes the properties present in the body.

use serde::{Deserialize, Serialize};

use crate::client::DeviceClient;
use crate::error::Error;
use crate::outcome::Outcome;
use crate::transport::Transport;

/// Path of the device information resource
pub const INFO: &str = "/api/v1/info";

/// Path of the lighting state resource
pub const STATE: &str = "/api/v1/state";

/// A single state property, `{"value": ...}` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value<T> {
  /// the property's value
  pub value: T,
}

impl<T> From<T> for Value<T> {
  fn from(value: T) -> Self {
    Self { value }
  }
}

/// Lighting state as reported by a device.
///
/// Properties the device did not report are `None`.
///
/// ```
/// use toad_light::state::State;
///
/// let state: State = serde_json::from_str(r#"{"on":{"value":true},"brightness":{"value":40}}"#).unwrap();
/// assert_eq!(state.on.map(|v| v.value), Some(true));
/// assert_eq!(state.brightness.map(|v| v.value), Some(40));
/// assert_eq!(state.hue, None);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct State {
  /// power
  #[serde(skip_serializing_if = "Option::is_none")]
  pub on: Option<Value<bool>>,
  /// brightness percentage
  #[serde(skip_serializing_if = "Option::is_none")]
  pub brightness: Option<Value<u8>>,
  /// color temperature in kelvin
  #[serde(rename = "ct", skip_serializing_if = "Option::is_none")]
  pub color_temperature: Option<Value<u16>>,
  /// hue in degrees
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hue: Option<Value<u16>>,
  /// saturation percentage
  #[serde(rename = "sat", skip_serializing_if = "Option::is_none")]
  pub saturation: Option<Value<u8>>,
}

/// A partial update of a device's lighting state.
///
/// Setters validate their argument against the range the device accepts.
///
/// ```
/// use toad_light::state::StateUpdate;
///
/// let update = StateUpdate::new().on(true).brightness(40).unwrap();
/// assert_eq!(update.to_json().unwrap(),
///            r#"{"on":{"value":true},"brightness":{"value":40}}"#);
///
/// assert!(StateUpdate::new().brightness(101).is_err());
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StateUpdate(State);

impl StateUpdate {
  /// Accepted brightness percentages
  pub const BRIGHTNESS: (u32, u32) = (0, 100);
  /// Accepted color temperatures, in kelvin
  pub const COLOR_TEMPERATURE: (u32, u32) = (2700, 6500);
  /// Accepted hues, in degrees
  pub const HUE: (u32, u32) = (0, 360);
  /// Accepted saturation percentages
  pub const SATURATION: (u32, u32) = (0, 100);

  /// An update changing nothing
  pub fn new() -> Self {
    Self::default()
  }

  /// Turn the light on or off
  pub fn on(mut self, on: bool) -> Self {
    self.0.on = Some(on.into());
    self
  }

  /// Set the brightness percentage
  pub fn brightness(mut self, pct: u8) -> Result<Self, Error> {
    check("brightness", pct.into(), Self::BRIGHTNESS)?;
    self.0.brightness = Some(pct.into());
    Ok(self)
  }

  /// Set the color temperature in kelvin
  pub fn color_temperature(mut self, kelvin: u16) -> Result<Self, Error> {
    check("color temperature", kelvin.into(), Self::COLOR_TEMPERATURE)?;
    self.0.color_temperature = Some(kelvin.into());
    Ok(self)
  }

  /// Set the hue in degrees
  pub fn hue(mut self, degrees: u16) -> Result<Self, Error> {
    check("hue", degrees.into(), Self::HUE)?;
    self.0.hue = Some(degrees.into());
    Ok(self)
  }

  /// Set the saturation percentage
  pub fn saturation(mut self, pct: u8) -> Result<Self, Error> {
    check("saturation", pct.into(), Self::SATURATION)?;
    self.0.saturation = Some(pct.into());
    Ok(self)
  }

  /// Does this update change nothing?
  pub fn is_empty(&self) -> bool {
    self.0 == State::default()
  }

  /// Serialize to the body of a PUT to [`STATE`]
  pub fn to_json(&self) -> serde_json::Result<String> {
    serde_json::to_string(&self.0)
  }
}

fn check(field: &'static str, value: u32, (min, max): (u32, u32)) -> Result<(), Error> {
  if (min..=max).contains(&value) {
    Ok(())
  } else {
    Err(Error::OutOfRange { field,
                            value,
                            min,
                            max })
  }
}

impl<T: Transport> DeviceClient<T> {
  /// GET the device information resource
  pub fn info(&mut self) -> Result<Outcome, Error> {
    self.get(INFO)
  }

  /// GET the lighting state resource
  pub fn state(&mut self) -> Result<Outcome, Error> {
    self.get(STATE)
  }

  /// PUT a partial state update.
  ///
  /// An empty update is still sent, as `{}`.
  pub fn set_state(&mut self, update: &StateUpdate) -> Result<Outcome, Error> {
    match update.to_json() {
      | Ok(body) => self.put(STATE, &body),
      | Err(e) => Ok(Outcome::failure(e.to_string())),
    }
  }

  /// Turn the light on
  pub fn turn_on(&mut self) -> Result<Outcome, Error> {
    self.set_state(&StateUpdate::new().on(true))
  }

  /// Turn the light off
  pub fn turn_off(&mut self) -> Result<Outcome, Error> {
    self.set_state(&StateUpdate::new().on(false))
  }

  /// Set the brightness percentage (0 to 100)
  pub fn set_brightness(&mut self, pct: u8) -> Result<Outcome, Error> {
    let update = StateUpdate::new().brightness(pct)?;
    self.set_state(&update)
  }

  /// Set the color temperature (2700K to 6500K)
  pub fn set_color_temperature(&mut self, kelvin: u16) -> Result<Outcome, Error> {
    let update = StateUpdate::new().color_temperature(kelvin)?;
    self.set_state(&update)
  }

  /// Set hue (0 to 360 degrees) and saturation (0 to 100 percent) together
  pub fn set_hue_saturation(&mut self, hue: u16, sat: u8) -> Result<Outcome, Error> {
    let update = StateUpdate::new().hue(hue)?.saturation(sat)?;
    self.set_state(&update)
  }
}
