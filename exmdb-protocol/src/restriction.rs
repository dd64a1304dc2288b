//! Restriction expression trees used to filter table loads.
//!
//! A [`Restriction`] is a recursive enum; compound nodes own their children
//! through `Vec` or `Box`, and leaves own (or borrow, see [`TaggedPropval`])
//! their values. The empty restriction [`Restriction::Null`] encodes to zero
//! bytes and is the only falsy node.

use crate::buffer::{ByteBuffer, Encode};
use crate::error::ProtocolError;
use crate::propval::TaggedPropval;

/// Relational operators for PROPERTY, PROPCOMP and SIZE nodes.
pub mod relop {
    pub const LT: u8 = 0x00;
    pub const LE: u8 = 0x01;
    pub const GT: u8 = 0x02;
    pub const GE: u8 = 0x03;
    pub const EQ: u8 = 0x04;
    pub const NE: u8 = 0x05;
    pub const RE: u8 = 0x06;
    pub const MEMBER_OF_DL: u8 = 0x64;
}

/// Match levels for CONTENT nodes. The low word selects the match mode, the
/// high word holds modifier flags.
pub mod fuzzy_level {
    pub const FULLSTRING: u32 = 0x0000_0000;
    pub const SUBSTRING: u32 = 0x0000_0001;
    pub const PREFIX: u32 = 0x0000_0002;

    pub const IGNORECASE: u32 = 0x0001_0000;
    pub const IGNORENONSPACE: u32 = 0x0002_0000;
    pub const LOOSE: u32 = 0x0004_0000;
}

/// Node discriminator written in front of every non-empty node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RestrictionKind {
    And = 0x00,
    Or = 0x01,
    Not = 0x02,
    Content = 0x03,
    Property = 0x04,
    PropComp = 0x05,
    Bitmask = 0x06,
    Size = 0x07,
    Exist = 0x08,
    SubObject = 0x09,
    Comment = 0x0a,
    Count = 0x0b,
}

/// Filter expression evaluated by the server.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Restriction<'a> {
    #[default]
    Null,
    And(Vec<Restriction<'a>>),
    Or(Vec<Restriction<'a>>),
    Not(Box<Restriction<'a>>),
    Content {
        fuzzy_level: u32,
        proptag: u32,
        propval: TaggedPropval<'a>,
    },
    Property {
        relop: u8,
        proptag: u32,
        propval: TaggedPropval<'a>,
    },
    PropComp {
        relop: u8,
        proptag1: u32,
        proptag2: u32,
    },
    Bitmask {
        all: bool,
        proptag: u32,
        mask: u32,
    },
    Size {
        relop: u8,
        proptag: u32,
        size: u32,
    },
    Exist {
        proptag: u32,
    },
    SubObject {
        subobject: u32,
        child: Box<Restriction<'a>>,
    },
    Comment {
        propvals: Vec<TaggedPropval<'a>>,
        child: Option<Box<Restriction<'a>>>,
    },
    Count {
        count: u32,
        child: Box<Restriction<'a>>,
    },
}

impl<'a> Restriction<'a> {
    pub fn null() -> Self {
        Restriction::Null
    }

    pub fn and(children: Vec<Restriction<'a>>) -> Self {
        Restriction::And(children)
    }

    pub fn or(children: Vec<Restriction<'a>>) -> Self {
        Restriction::Or(children)
    }

    pub fn not(child: Restriction<'a>) -> Self {
        Restriction::Not(Box::new(child))
    }

    /// Text/binary match. A zero `proptag` is replaced by the value's tag.
    pub fn content(fuzzy_level: u32, proptag: u32, propval: TaggedPropval<'a>) -> Self {
        Restriction::Content {
            fuzzy_level,
            proptag: tag_or_default(proptag, &propval),
            propval,
        }
    }

    /// Property-to-value comparison. A zero `proptag` is replaced by the
    /// value's tag.
    pub fn property(relop: u8, proptag: u32, propval: TaggedPropval<'a>) -> Self {
        Restriction::Property {
            relop,
            proptag: tag_or_default(proptag, &propval),
            propval,
        }
    }

    pub fn propcomp(relop: u8, proptag1: u32, proptag2: u32) -> Self {
        Restriction::PropComp {
            relop,
            proptag1,
            proptag2,
        }
    }

    pub fn bitmask(all: bool, proptag: u32, mask: u32) -> Self {
        Restriction::Bitmask { all, proptag, mask }
    }

    pub fn size(relop: u8, proptag: u32, size: u32) -> Self {
        Restriction::Size {
            relop,
            proptag,
            size,
        }
    }

    pub fn exist(proptag: u32) -> Self {
        Restriction::Exist { proptag }
    }

    pub fn subobject(subobject: u32, child: Restriction<'a>) -> Self {
        Restriction::SubObject {
            subobject,
            child: Box::new(child),
        }
    }

    /// Annotation node. Fails unless there are 1 to 255 values.
    pub fn comment(
        propvals: Vec<TaggedPropval<'a>>,
        child: Option<Restriction<'a>>,
    ) -> Result<Self, ProtocolError> {
        comment_count(propvals.len())?;
        Ok(Restriction::Comment {
            propvals,
            child: child.map(Box::new),
        })
    }

    pub fn count(count: u32, child: Restriction<'a>) -> Self {
        Restriction::Count {
            count,
            child: Box::new(child),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Restriction::Null)
    }

    /// `true` for every node except [`Restriction::Null`].
    pub fn is_truthy(&self) -> bool {
        !self.is_null()
    }

    pub fn kind(&self) -> Option<RestrictionKind> {
        Some(match self {
            Restriction::Null => return None,
            Restriction::And(_) => RestrictionKind::And,
            Restriction::Or(_) => RestrictionKind::Or,
            Restriction::Not(_) => RestrictionKind::Not,
            Restriction::Content { .. } => RestrictionKind::Content,
            Restriction::Property { .. } => RestrictionKind::Property,
            Restriction::PropComp { .. } => RestrictionKind::PropComp,
            Restriction::Bitmask { .. } => RestrictionKind::Bitmask,
            Restriction::Size { .. } => RestrictionKind::Size,
            Restriction::Exist { .. } => RestrictionKind::Exist,
            Restriction::SubObject { .. } => RestrictionKind::SubObject,
            Restriction::Comment { .. } => RestrictionKind::Comment,
            Restriction::Count { .. } => RestrictionKind::Count,
        })
    }

    /// Deep-copies any borrowed values in the tree.
    pub fn into_owned(self) -> Restriction<'static> {
        let owned_box = |child: Box<Restriction<'a>>| Box::new(child.into_owned());
        match self {
            Restriction::Null => Restriction::Null,
            Restriction::And(children) => {
                Restriction::And(children.into_iter().map(Restriction::into_owned).collect())
            }
            Restriction::Or(children) => {
                Restriction::Or(children.into_iter().map(Restriction::into_owned).collect())
            }
            Restriction::Not(child) => Restriction::Not(owned_box(child)),
            Restriction::Content {
                fuzzy_level,
                proptag,
                propval,
            } => Restriction::Content {
                fuzzy_level,
                proptag,
                propval: propval.into_owned(),
            },
            Restriction::Property {
                relop,
                proptag,
                propval,
            } => Restriction::Property {
                relop,
                proptag,
                propval: propval.into_owned(),
            },
            Restriction::PropComp {
                relop,
                proptag1,
                proptag2,
            } => Restriction::PropComp {
                relop,
                proptag1,
                proptag2,
            },
            Restriction::Bitmask { all, proptag, mask } => {
                Restriction::Bitmask { all, proptag, mask }
            }
            Restriction::Size {
                relop,
                proptag,
                size,
            } => Restriction::Size {
                relop,
                proptag,
                size,
            },
            Restriction::Exist { proptag } => Restriction::Exist { proptag },
            Restriction::SubObject { subobject, child } => Restriction::SubObject {
                subobject,
                child: owned_box(child),
            },
            Restriction::Comment { propvals, child } => Restriction::Comment {
                propvals: propvals
                    .into_iter()
                    .map(TaggedPropval::into_owned)
                    .collect(),
                child: child.map(owned_box),
            },
            Restriction::Count { count, child } => Restriction::Count {
                count,
                child: owned_box(child),
            },
        }
    }

    /// Encodes a child node, which must not be empty.
    fn encode_child(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        if self.is_null() {
            return Err(ProtocolError::NestedNullRestriction);
        }
        self.encode(buf)
    }

    fn encode_children(
        children: &[Restriction<'_>],
        buf: &mut ByteBuffer,
    ) -> Result<(), ProtocolError> {
        let count = u32::try_from(children.len()).map_err(|_| ProtocolError::TooManyElements {
            count: children.len(),
            max: u32::MAX as usize,
        })?;
        buf.push_u32(count);
        children.iter().try_for_each(|child| child.encode_child(buf))
    }
}

impl Encode for Restriction<'_> {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        let Some(kind) = self.kind() else {
            return Ok(());
        };
        buf.push_u8(kind as u8);
        match self {
            Restriction::Null => {}
            Restriction::And(children) | Restriction::Or(children) => {
                Self::encode_children(children, buf)?;
            }
            Restriction::Not(child) => child.encode_child(buf)?,
            Restriction::Content {
                fuzzy_level,
                proptag,
                propval,
            } => {
                buf.push_u32(*fuzzy_level);
                buf.push_u32(*proptag);
                buf.push(propval)?;
            }
            Restriction::Property {
                relop,
                proptag,
                propval,
            } => {
                buf.push_u8(*relop);
                buf.push_u32(*proptag);
                buf.push(propval)?;
            }
            Restriction::PropComp {
                relop,
                proptag1,
                proptag2,
            } => {
                buf.push_u8(*relop);
                buf.push_u32(*proptag1);
                buf.push_u32(*proptag2);
            }
            Restriction::Bitmask { all, proptag, mask } => {
                buf.push_bool(*all);
                buf.push_u32(*proptag);
                buf.push_u32(*mask);
            }
            Restriction::Size {
                relop,
                proptag,
                size,
            } => {
                buf.push_u8(*relop);
                buf.push_u32(*proptag);
                buf.push_u32(*size);
            }
            Restriction::Exist { proptag } => buf.push_u32(*proptag),
            Restriction::SubObject { subobject, child } => {
                buf.push_u32(*subobject);
                child.encode_child(buf)?;
            }
            Restriction::Comment { propvals, child } => {
                buf.push_u8(comment_count(propvals.len())?);
                propvals.iter().try_for_each(|propval| buf.push(propval))?;
                match child {
                    Some(child) => {
                        buf.push_bool(true);
                        child.encode_child(buf)?;
                    }
                    None => buf.push_bool(false),
                }
            }
            Restriction::Count { count, child } => {
                buf.push_u32(*count);
                child.encode_child(buf)?;
            }
        }
        Ok(())
    }
}

fn tag_or_default(proptag: u32, propval: &TaggedPropval<'_>) -> u32 {
    if proptag == 0 {
        propval.tag
    } else {
        proptag
    }
}

fn comment_count(count: usize) -> Result<u8, ProtocolError> {
    match u8::try_from(count) {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ProtocolError::InvalidCommentCount(count)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags;

    fn encode(restriction: &Restriction<'_>) -> Vec<u8> {
        let mut buf = ByteBuffer::new();
        buf.push(restriction).unwrap();
        buf.as_slice().to_vec()
    }

    #[test]
    fn test_null_is_empty_and_falsy() {
        let null = Restriction::null();
        assert!(encode(&null).is_empty());
        assert!(!null.is_truthy());
        assert_eq!(null, Restriction::default());
    }

    #[test]
    fn test_exist() {
        let exist = Restriction::exist(tags::DISPLAYNAME);
        assert!(exist.is_truthy());
        assert_eq!(encode(&exist), vec![0x08, 0x1f, 0x00, 0x01, 0x30]);
    }

    #[test]
    fn test_empty_and() {
        assert_eq!(encode(&Restriction::and(vec![])), vec![0x00, 0, 0, 0, 0]);
        assert_eq!(encode(&Restriction::or(vec![])), vec![0x01, 0, 0, 0, 0]);
    }

    #[test]
    fn test_nested_tree() {
        let restriction = Restriction::and(vec![
            Restriction::exist(1),
            Restriction::not(Restriction::size(relop::GT, 2, 3)),
        ]);
        let expected = vec![
            0x00, 2, 0, 0, 0, // AND, two children
            0x08, 1, 0, 0, 0, // EXIST
            0x02, // NOT
            0x07, relop::GT, 2, 0, 0, 0, 3, 0, 0, 0, // SIZE
        ];
        assert_eq!(encode(&restriction), expected);
    }

    #[test]
    fn test_property_defaults_tag_to_value() {
        let value = TaggedPropval::string(tags::DISPLAYNAME, "Inbox");
        let restriction = Restriction::property(relop::EQ, 0, value);
        match &restriction {
            Restriction::Property { proptag, .. } => assert_eq!(*proptag, tags::DISPLAYNAME),
            other => panic!("unexpected node {:?}", other),
        }

        let bytes = encode(&restriction);
        assert_eq!(&bytes[..6], &[0x04, relop::EQ, 0x1f, 0x00, 0x01, 0x30]);
        assert_eq!(&bytes[10..], b"Inbox\0");
    }

    #[test]
    fn test_content_encodes_fuzzy_level_as_u32() {
        let value = TaggedPropval::string(tags::DISPLAYNAME, "box");
        let restriction = Restriction::content(
            fuzzy_level::SUBSTRING | fuzzy_level::IGNORECASE,
            0,
            value,
        );
        let bytes = encode(&restriction);
        assert_eq!(&bytes[..5], &[0x03, 0x01, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_explicit_tag_wins() {
        let value = TaggedPropval::u64(tags::FOLDERID, 7);
        let restriction = Restriction::property(relop::NE, tags::PARENTFOLDERID, value);
        assert!(matches!(
            restriction,
            Restriction::Property { proptag, .. } if proptag == tags::PARENTFOLDERID
        ));
    }

    #[test]
    fn test_comment_bounds() {
        assert!(matches!(
            Restriction::comment(vec![], None),
            Err(ProtocolError::InvalidCommentCount(0))
        ));

        let too_many = (0..256).map(|i| TaggedPropval::u32(0x0001_0003, i)).collect();
        assert!(matches!(
            Restriction::comment(too_many, None),
            Err(ProtocolError::InvalidCommentCount(256))
        ));

        let max = (0..255).map(|i| TaggedPropval::u32(0x0001_0003, i)).collect();
        assert!(Restriction::comment(max, None).is_ok());
    }

    #[test]
    fn test_comment_checked_at_encode() {
        // Built directly, bypassing the constructor
        let restriction = Restriction::Comment {
            propvals: vec![],
            child: None,
        };
        let mut buf = ByteBuffer::new();
        assert!(matches!(
            buf.push(&restriction),
            Err(ProtocolError::InvalidCommentCount(0))
        ));

        let restriction = Restriction::Comment {
            propvals: (0..256).map(|i| TaggedPropval::u32(0x0001_0003, i)).collect(),
            child: None,
        };
        let mut buf = ByteBuffer::new();
        assert!(matches!(
            buf.push(&restriction),
            Err(ProtocolError::InvalidCommentCount(256))
        ));
    }

    #[test]
    fn test_comment_with_child() {
        let restriction = Restriction::comment(
            vec![TaggedPropval::u32(0x0001_0003, 9)],
            Some(Restriction::exist(5)),
        )
        .unwrap();
        let expected = vec![
            0x0a, 1, // COMMENT, one value
            0x03, 0x00, 0x01, 0x00, 9, 0, 0, 0, // propval
            1, // child present
            0x08, 5, 0, 0, 0,
        ];
        assert_eq!(encode(&restriction), expected);

        let bare = Restriction::comment(vec![TaggedPropval::u32(0x0001_0003, 9)], None).unwrap();
        assert_eq!(*encode(&bare).last().unwrap(), 0);
    }

    #[test]
    fn test_nested_null_rejected() {
        let restriction = Restriction::not(Restriction::null());
        let mut buf = ByteBuffer::new();
        assert!(matches!(
            buf.push(&restriction),
            Err(ProtocolError::NestedNullRestriction)
        ));
    }

    #[test]
    fn test_scalar_nodes() {
        assert_eq!(
            encode(&Restriction::bitmask(true, 1, 0xff)),
            vec![0x06, 1, 1, 0, 0, 0, 0xff, 0, 0, 0]
        );
        assert_eq!(
            encode(&Restriction::propcomp(relop::LE, 1, 2)),
            vec![0x05, relop::LE, 1, 0, 0, 0, 2, 0, 0, 0]
        );
        assert_eq!(
            encode(&Restriction::subobject(4, Restriction::exist(1))),
            vec![0x09, 4, 0, 0, 0, 0x08, 1, 0, 0, 0]
        );
        assert_eq!(
            encode(&Restriction::count(3, Restriction::exist(1))),
            vec![0x0b, 3, 0, 0, 0, 0x08, 1, 0, 0, 0]
        );
    }

    #[test]
    fn test_into_owned_detaches_borrowed_values() {
        let name = String::from("Inbox");
        let borrowed = Restriction::or(vec![Restriction::property(
            relop::EQ,
            0,
            TaggedPropval::string(tags::DISPLAYNAME, name.as_str()),
        )]);
        let owned = borrowed.clone().into_owned();
        drop(borrowed);
        drop(name);
        assert_eq!(
            encode(&owned)[..1],
            [RestrictionKind::Or as u8]
        );
    }
}
