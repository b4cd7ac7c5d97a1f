use crate::events::DriverStateChanged;
use tokio::sync::mpsc;

/// Fire-and-forget channel to the controller that submitted the driver.
pub trait ControllerChannel: Send + Sync {
    fn send(&self, message: DriverStateChanged);
}

impl ControllerChannel for mpsc::UnboundedSender<DriverStateChanged> {
    fn send(&self, message: DriverStateChanged) {
        // the controller may already be gone, nobody is left to tell
        let _ = mpsc::UnboundedSender::send(self, message);
    }
}
