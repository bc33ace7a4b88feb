pub mod actions;
pub mod clock;
pub mod config;
pub mod controls;
pub mod gesture;
pub mod host;
pub mod logging;
pub mod timer;
pub mod view;
pub mod widget;

pub use actions::Action;
pub use clock::AnchoredClock;
pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::Millis;
pub use config::CardConfig;
pub use config::ConfigError;
pub use config::WidgetFile;
pub use gesture::Gesture;
pub use gesture::GestureRecognizer;
pub use host::EntityState;
pub use host::Host;
pub use host::HostError;
pub use host::HostEvent;
pub use host::ServiceCall;
pub use host::SimulatedHost;
pub use timer::TimerSnapshot;
pub use timer::TimerTracker;
pub use view::CardView;
pub use widget::Widget;
pub use widget::WidgetEvent;
