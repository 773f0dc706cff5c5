//! manages the interaction with datastore.
//! To use, choose a specialized Store struct and create it with its `new` constructor.
//! Then use `get` and `set` to operate with the datastore.
//! Finally `flush` the store, or let it flush on drop.

use crate::math::Uint;
use crate::protocol::error::Result;

/// provides an access to the datastore.
/// # Example
/// ```
/// use custody::store::{Store, disk::DiskStore};
/// let dir = std::env::temp_dir().join("custody-doc-store");
/// let mut store = DiskStore::new(&dir, "test").unwrap();
/// let write = vec![1, 2, 3, 4, 5];
/// store.set("test_data", &write).unwrap();
/// let read = store.get::<Vec<i32>>("test_data").unwrap();
/// assert_eq!(read, write);
/// store.flush().unwrap();
/// # std::fs::remove_dir_all(&dir).unwrap();
/// ```
pub trait Store {
    fn get<T: StoreValue>(&self, key: &str) -> Result<T>;
    fn set(&mut self, key: &str, value: &impl StoreValue) -> Result<()>;
}

/// provides a way to convert a value to bytes and back, so that it can be stored in the datastore.
pub trait StoreValue: Clone {
    fn to_bytes(self) -> Vec<u8>;
    fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, ParseError>
    where
        Self: Sized;
}

/// error returned when parsing a value from bytes fails.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ParseError;

macro_rules! impl_store_value_for_numerical_type {
    ($($t:ty)+) => {
        $(impl StoreValue for $t {
            fn to_bytes(self) -> Vec<u8> {
                self.to_le_bytes().to_vec()
            }

            fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, ParseError> where Self:Sized
            {
                match bytes.try_into() {
                    Ok(bytes_array) => Ok(Self::from_le_bytes(bytes_array)),
                    Err(_e) => Err(ParseError),
                }
            }
        })+
    };
}

impl_store_value_for_numerical_type!(u8 u32 u64 i32);

/// field elements travel as their big-endian integer representation
impl StoreValue for Uint {
    fn to_bytes(self) -> Vec<u8> {
        self.to_be_bytes().as_ref().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, ParseError> {
        if bytes.len() == Uint::BYTES {
            Ok(Uint::from_be_slice(bytes))
        } else {
            Err(ParseError)
        }
    }
}

///! `Vec<T>` where `T` has no static size may cause parse error
impl<T: StoreValue> StoreValue for Vec<T> {
    fn to_bytes(self) -> Vec<u8> {
        self.into_iter().fold(vec![], |mut acc, item| {
            acc.extend(item.to_bytes());
            acc
        })
    }

    fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, ParseError>
    where
        Self: Sized,
    {
        let elem_size = std::mem::size_of::<T>();
        if elem_size == 0 || bytes.len() % elem_size != 0 {
            return Err(ParseError);
        }
        let mut res = Vec::<T>::with_capacity(bytes.len() / elem_size);
        for chunk in bytes.chunks(elem_size) {
            res.push(T::from_bytes(chunk)?);
        }
        Ok(res)
    }
}

pub mod disk;
