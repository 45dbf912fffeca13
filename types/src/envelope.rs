//! Conversions between rank-level values and protocol messages.

use crate::rank::frame::Kind;
use crate::{Envelope, Frame, Hello, Lane, LaneKind, Rank, WireError};

fn narrow(value: usize) -> Result<u32, WireError> {
    u32::try_from(value).map_err(|_| WireError::FieldOverflow(value))
}

impl Hello {
    pub fn announce(rank: Rank, size: usize) -> Result<Self, WireError> {
        Ok(Self {
            rank: narrow(rank)?,
            size: narrow(size)?,
        })
    }

    /// The announced `(rank, world size)`.
    pub fn world(&self) -> (Rank, usize) {
        (self.rank as Rank, self.size as usize)
    }
}

impl Envelope {
    pub fn addressed(
        src: Rank,
        dest: Rank,
        lane: Lane,
        payload: Vec<f64>,
    ) -> Result<Self, WireError> {
        let (kind, tag) = match lane {
            Lane::Direct(tag) => (LaneKind::Direct, tag),
            Lane::Broadcast => (LaneKind::Broadcast, 0),
        };
        Ok(Self {
            src: narrow(src)?,
            dest: narrow(dest)?,
            lane: kind as i32,
            tag,
            payload,
        })
    }

    pub fn source(&self) -> Rank {
        self.src as Rank
    }

    pub fn destination(&self) -> Rank {
        self.dest as Rank
    }

    pub fn decode_lane(&self) -> Result<Lane, WireError> {
        match LaneKind::try_from(self.lane) {
            Ok(LaneKind::Direct) => Ok(Lane::Direct(self.tag)),
            Ok(LaneKind::Broadcast) => Ok(Lane::Broadcast),
            Err(_) => Err(WireError::UnknownLane(self.lane)),
        }
    }
}

impl Frame {
    /// The hello carried by this frame, if any.
    pub fn as_hello(&self) -> Option<&Hello> {
        match &self.kind {
            Some(Kind::Hello(hello)) => Some(hello),
            _ => None,
        }
    }

    pub fn into_envelope(self) -> Option<Envelope> {
        match self.kind {
            Some(Kind::Envelope(envelope)) => Some(envelope),
            _ => None,
        }
    }
}

impl From<Hello> for Frame {
    fn from(hello: Hello) -> Self {
        Self {
            kind: Some(Kind::Hello(hello)),
        }
    }
}

impl From<Envelope> for Frame {
    fn from(envelope: Envelope) -> Self {
        Self {
            kind: Some(Kind::Envelope(envelope)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_lane_keeps_its_tag() {
        let envelope = Envelope::addressed(3, 1, Lane::Direct(42), vec![1.5, -2.0]).unwrap();

        assert_eq!(envelope.source(), 3);
        assert_eq!(envelope.destination(), 1);
        assert_eq!(envelope.decode_lane().unwrap(), Lane::Direct(42));
        assert_eq!(envelope.payload, vec![1.5, -2.0]);
    }

    #[test]
    fn broadcast_lane_ignores_the_tag_field() {
        let mut envelope = Envelope::addressed(0, 2, Lane::Broadcast, vec![]).unwrap();
        envelope.tag = 9;

        assert_eq!(envelope.decode_lane().unwrap(), Lane::Broadcast);
    }

    #[test]
    fn unknown_lane_is_rejected() {
        let mut envelope = Envelope::addressed(1, 0, Lane::Direct(9), vec![]).unwrap();
        envelope.lane = 7;

        assert!(matches!(
            envelope.decode_lane(),
            Err(WireError::UnknownLane(7))
        ));
    }

    #[test]
    fn ranks_must_fit_the_wire() {
        let too_big = u32::MAX as usize + 1;

        assert!(matches!(
            Hello::announce(0, too_big),
            Err(WireError::FieldOverflow(n)) if n == too_big
        ));
        assert!(Envelope::addressed(too_big, 0, Lane::Broadcast, vec![]).is_err());
    }

    #[test]
    fn frames_carry_hello_or_envelope() {
        let hello = Frame::from(Hello::announce(2, 4).unwrap());
        assert_eq!(hello.as_hello().map(Hello::world), Some((2, 4)));
        assert_eq!(hello.into_envelope(), None);

        let envelope = Envelope::addressed(0, 1, Lane::Direct(1), vec![8.0]).unwrap();
        let frame = Frame::from(envelope.clone());
        assert!(frame.as_hello().is_none());
        assert_eq!(frame.into_envelope(), Some(envelope));
    }
}
