//! Virtual joystick exposed through Linux uinput.

use anyhow::Context;
use evdev::uinput::VirtualDevice;
use evdev::{
    AbsInfo, AbsoluteAxisCode, AttributeSet, BusType, EventType, InputEvent, InputId, KeyCode,
    UinputAbsSetup,
};
use handwheel_config::Device;

use super::{Axis, HidSink};

pub const AXIS_MAX: i32 = 32767;

pub struct Uinput {
    device: VirtualDevice,
    pending: Vec<InputEvent>,
}

impl Uinput {
    pub fn new(identity: &Device) -> anyhow::Result<Self> {
        let setup_axis = |code| {
            UinputAbsSetup::new(code, AbsInfo::new(0, -AXIS_MAX, AXIS_MAX, 0, 0, 0))
        };

        // Games look for at least one button before they accept a joystick.
        let mut keys = AttributeSet::<KeyCode>::new();
        keys.insert(KeyCode::BTN_TRIGGER);
        keys.insert(KeyCode::BTN_THUMB);

        let id = InputId::new(
            BusType::BUS_USB,
            identity.vendor,
            identity.product,
            identity.version,
        );

        let device = VirtualDevice::builder()
            .context("error opening uinput")?
            .name(&identity.name)
            .input_id(id)
            .with_keys(&keys)
            .context("error adding buttons")?
            .with_absolute_axis(&setup_axis(axis_code(Axis::Steering)))
            .context("error adding the steering axis")?
            .build()
            .context("error creating virtual device")?;

        info!(
            "created virtual joystick {:?} ({:04x}:{:04x})",
            identity.name, identity.vendor, identity.product
        );

        Ok(Self {
            device,
            pending: Vec::new(),
        })
    }
}

fn axis_code(axis: Axis) -> AbsoluteAxisCode {
    match axis {
        Axis::Steering => AbsoluteAxisCode::ABS_X,
    }
}

fn to_raw(value: f64) -> i32 {
    (value.clamp(-1., 1.) * f64::from(AXIS_MAX)).round() as i32
}

impl HidSink for Uinput {
    fn set_axis(&mut self, axis: Axis, value: f64) -> anyhow::Result<()> {
        anyhow::ensure!(value.is_finite(), "non-finite value {value} for {axis:?}");

        self.pending.push(InputEvent::new(
            EventType::ABSOLUTE.0,
            axis_code(axis).0,
            to_raw(value),
        ));
        Ok(())
    }

    fn sync(&mut self) -> anyhow::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        // emit() terminates the batch with SYN_REPORT.
        let res = self.device.emit(&self.pending);
        self.pending.clear();
        res.context("error writing to virtual device")
    }
}
