use crate::utils::MergeWith;

/// Identity the virtual joystick presents to applications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub name: String,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

impl Default for Device {
    fn default() -> Self {
        // Logitech G29, which most racing games recognize out of the box.
        Self {
            name: String::from("Logitech G29 Driving Force Racing Wheel"),
            vendor: 0x046d,
            product: 0xc24f,
            version: 0x0001,
        }
    }
}

#[derive(knuffel::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct DevicePart {
    #[knuffel(child, unwrap(argument))]
    pub name: Option<String>,
    #[knuffel(child, unwrap(argument))]
    pub vendor: Option<u16>,
    #[knuffel(child, unwrap(argument))]
    pub product: Option<u16>,
    #[knuffel(child, unwrap(argument))]
    pub version: Option<u16>,
}

impl MergeWith<DevicePart> for Device {
    fn merge_with(&mut self, part: &DevicePart) {
        merge_clone!((self, part), name, vendor, product, version);
    }
}
