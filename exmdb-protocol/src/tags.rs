//! Well-known property tags and folder ids.

/// Folder ids of a domain's public store.
pub mod public_fid {
    pub const ROOT: u64 = 0x01;
    pub const IPMSUBTREE: u64 = 0x02;
    pub const NONIPMSUBTREE: u64 = 0x03;
    pub const EFORMSREGISTRY: u64 = 0x04;
}

/// Folder ids of a user's private store.
pub mod private_fid {
    pub const ROOT: u64 = 0x01;
    pub const DEFERRED_ACTION: u64 = 0x02;
    pub const SPOOLER_QUEUE: u64 = 0x03;
    pub const IPMSUBTREE: u64 = 0x09;
    pub const INBOX: u64 = 0x0d;
    pub const OUTBOX: u64 = 0x0e;
    pub const SENT_ITEMS: u64 = 0x0f;
    pub const DELETED_ITEMS: u64 = 0x10;
    pub const CONTACTS: u64 = 0x11;
    pub const CALENDAR: u64 = 0x12;
    pub const JOURNAL: u64 = 0x13;
    pub const NOTES: u64 = 0x14;
    pub const TASKS: u64 = 0x15;
    pub const DRAFT: u64 = 0x16;
}

pub const ENTRYID: u32 = 0x0fff_0102;
pub const MESSAGESIZEEXTENDED: u32 = 0x0e08_0014;
pub const INTERNETARTICLENUMBER: u32 = 0x0e23_0003;
pub const DISPLAYNAME: u32 = 0x3001_001f;
pub const COMMENT: u32 = 0x3004_001f;
pub const CREATIONTIME: u32 = 0x3007_0040;
pub const LASTMODIFICATIONTIME: u32 = 0x3008_0040;
pub const FOLDERTYPE: u32 = 0x3601_0003;
pub const CONTENTCOUNT: u32 = 0x3602_0003;
pub const SUBFOLDERS: u32 = 0x360a_000b;
pub const CONTAINERCLASS: u32 = 0x3613_001f;
pub const SMTPADDRESS: u32 = 0x39fe_001f;
pub const HIERREV: u32 = 0x4082_0040;
pub const HIERARCHYCHANGENUMBER: u32 = 0x663e_0003;
pub const DELETEDFOLDERTOTAL: u32 = 0x6641_0003;
pub const MEMBERID: u32 = 0x6671_0014;
pub const MEMBERNAME: u32 = 0x6672_001f;
pub const MEMBERRIGHTS: u32 = 0x6673_0003;
pub const LOCALCOMMITTIMEMAX: u32 = 0x670a_0040;
pub const DELETEDCOUNTTOTAL: u32 = 0x670b_0003;
pub const FOLDERID: u32 = 0x6748_0014;
pub const PARENTFOLDERID: u32 = 0x6749_0014;
pub const MID: u32 = 0x674a_0014;
pub const CHANGEKEY: u32 = 0x65e2_0102;
pub const PREDECESSORCHANGELIST: u32 = 0x65e3_0102;

/// Looks up the name of a well-known tag.
pub fn name(tag: u32) -> Option<&'static str> {
    Some(match tag {
        ENTRYID => "ENTRYID",
        MESSAGESIZEEXTENDED => "MESSAGESIZEEXTENDED",
        INTERNETARTICLENUMBER => "INTERNETARTICLENUMBER",
        DISPLAYNAME => "DISPLAYNAME",
        COMMENT => "COMMENT",
        CREATIONTIME => "CREATIONTIME",
        LASTMODIFICATIONTIME => "LASTMODIFICATIONTIME",
        FOLDERTYPE => "FOLDERTYPE",
        CONTENTCOUNT => "CONTENTCOUNT",
        SUBFOLDERS => "SUBFOLDERS",
        CONTAINERCLASS => "CONTAINERCLASS",
        SMTPADDRESS => "SMTPADDRESS",
        HIERREV => "HIERREV",
        HIERARCHYCHANGENUMBER => "HIERARCHYCHANGENUMBER",
        DELETEDFOLDERTOTAL => "DELETEDFOLDERTOTAL",
        MEMBERID => "MEMBERID",
        MEMBERNAME => "MEMBERNAME",
        MEMBERRIGHTS => "MEMBERRIGHTS",
        LOCALCOMMITTIMEMAX => "LOCALCOMMITTIMEMAX",
        DELETEDCOUNTTOTAL => "DELETEDCOUNTTOTAL",
        FOLDERID => "FOLDERID",
        PARENTFOLDERID => "PARENTFOLDERID",
        MID => "MID",
        CHANGEKEY => "CHANGEKEY",
        PREDECESSORCHANGELIST => "PREDECESSORCHANGELIST",
        _ => return None,
    })
}

/// Resolves a tag given by name (case-insensitive) or as a hex/decimal number.
pub fn parse(input: &str) -> Option<u32> {
    let upper = input.to_ascii_uppercase();
    if let Some(tag) = ALL.iter().copied().find(|&tag| name(tag) == Some(upper.as_str())) {
        return Some(tag);
    }
    match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => input.parse().ok(),
    }
}

const ALL: &[u32] = &[
    ENTRYID,
    MESSAGESIZEEXTENDED,
    INTERNETARTICLENUMBER,
    DISPLAYNAME,
    COMMENT,
    CREATIONTIME,
    LASTMODIFICATIONTIME,
    FOLDERTYPE,
    CONTENTCOUNT,
    SUBFOLDERS,
    CONTAINERCLASS,
    SMTPADDRESS,
    HIERREV,
    HIERARCHYCHANGENUMBER,
    DELETEDFOLDERTOTAL,
    MEMBERID,
    MEMBERNAME,
    MEMBERRIGHTS,
    LOCALCOMMITTIMEMAX,
    DELETEDCOUNTTOTAL,
    FOLDERID,
    PARENTFOLDERID,
    MID,
    CHANGEKEY,
    PREDECESSORCHANGELIST,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_tag_has_a_name() {
        for &tag in ALL {
            assert!(name(tag).is_some(), "missing name for {:#010x}", tag);
        }
        assert_eq!(name(0x1234_0003), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse("displayname"), Some(DISPLAYNAME));
        assert_eq!(parse("FOLDERID"), Some(FOLDERID));
        assert_eq!(parse("0x3001001f"), Some(DISPLAYNAME));
        assert_eq!(parse("805371935"), Some(DISPLAYNAME));
        assert_eq!(parse("nonsense"), None);
    }
}
