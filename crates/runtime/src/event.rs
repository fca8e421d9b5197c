//! System event vocabulary.
//!
//! Two disjoint sets: [`Notification`]s flow background → render,
//! [`Command`]s flow render → background. Payloads travel by value inside the
//! variant, so ownership moves with the message and nothing is shared across
//! the channel boundary.

/// Background → render: something happened that the UI may want to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Notification {
    /// Wireless link came up
    WifiConnected,
    /// Wireless link went down
    WifiDisconnected,
    /// Wall-clock time changed (periodic re-broadcast)
    TimeUpdated,
    /// Fresh weather reading
    Weather {
        /// Temperature in whole degrees Celsius
        temp_c: i32,
    },
}

/// Render → background: work the UI wants done off the render context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Bring the wireless link up
    ConnectWifi,
    /// Fetch a weather reading
    FetchWeather,
    /// Reboot the system (the only deliberately fatal command)
    Reboot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_plain_values() {
        // Both vocabularies must stay Copy: they are queued by value and a
        // dropped message must never leak a resource.
        let n = Notification::Weather { temp_c: -7 };
        let m = n;
        assert_eq!(n, m);

        let c = Command::FetchWeather;
        let d = c;
        assert_eq!(c, d);
    }
}
