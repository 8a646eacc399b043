use embassy_stm32::usb_otg::{self, Driver};
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::{Builder, Config, UsbDevice};
use static_cell::StaticCell;

use boom_telemetry::drivers::frame::FrameSink;

bind_interrupts!(pub struct Irqs {
    OTG_FS => usb_otg::InterruptHandler<peripherals::USB_OTG_FS>;
});

pub type UsbDriver = Driver<'static, peripherals::USB_OTG_FS>;
pub type UsbSerial<'a> = CdcAcmClass<'a, UsbDriver>;

/// Full-speed bulk packet; one telemetry frame always fits.
const MAX_PACKET_SIZE: u16 = 64;

struct UsbBuffers {
    ep_out: [u8; 256],
    config_desc: [u8; 256],
    bos_desc: [u8; 256],
    control: [u8; 64],
}

static BUFFERS: StaticCell<UsbBuffers> = StaticCell::new();
static CDC_STATE: StaticCell<State<'static>> = StaticCell::new();

#[embassy_executor::task]
pub async fn usb_task(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    device.run().await
}

pub fn init(
    usb_periph: peripherals::USB_OTG_FS,
    pa12: peripherals::PA12,
    pa11: peripherals::PA11,
) -> (UsbDevice<'static, UsbDriver>, UsbSerial<'static>) {
    let bufs = BUFFERS.init(UsbBuffers {
        ep_out: [0; 256],
        config_desc: [0; 256],
        bos_desc: [0; 256],
        control: [0; 64],
    });

    let mut usb_config = usb_otg::Config::default();
    usb_config.vbus_detection = false;
    let driver = Driver::new_fs(usb_periph, Irqs, pa12, pa11, &mut bufs.ep_out, usb_config);

    let mut config = Config::new(0xc0de, 0xcafe);
    config.manufacturer = Some("Boom Rig");
    config.product = Some("Boom Telemetry");
    config.serial_number = Some("00000001");

    let mut builder = Builder::new(
        driver,
        config,
        &mut bufs.config_desc,
        &mut bufs.bos_desc,
        &mut [], // msos_descs
        &mut bufs.control,
    );

    let state = CDC_STATE.init(State::new());
    let class = CdcAcmClass::new(&mut builder, state, MAX_PACKET_SIZE);
    let usb = builder.build();

    (usb, class)
}

/// Telemetry output over CDC-ACM. Frames are dropped while no host has the
/// port open (DTR low).
pub struct UsbFrameSink<'d> {
    class: UsbSerial<'d>,
}

impl<'d> UsbFrameSink<'d> {
    pub fn new(class: UsbSerial<'d>) -> Self {
        Self { class }
    }
}

impl<'d> FrameSink for UsbFrameSink<'d> {
    type Error = EndpointError;

    async fn write_frame(&mut self, bytes: &[u8]) -> Result<(), EndpointError> {
        if !self.class.dtr() {
            return Ok(());
        }
        for chunk in bytes.chunks(MAX_PACKET_SIZE as usize) {
            self.class.write_packet(chunk).await?;
        }
        Ok(())
    }
}
